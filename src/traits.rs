use std::sync::Arc;

use async_trait::async_trait;
use tokio_stream::wrappers::BroadcastStream;

use crate::aggregate::Summary;
use crate::catalog::Catalog;
use crate::db::entity::CleaningInventory;
use crate::report::Artifact;
use crate::store::NewRecord;
use crate::store::StoreChange;
use crate::types::Device;
use crate::types::InventoryError;
use crate::types::Result;
use crate::types::SortOrder;

/// Storage of inventory rows.
///
/// Rows are returned raw; interpreting them is left to the [aggregation](crate::aggregate) code so that a malformed
/// row can be skipped instead of failing the whole query.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    async fn all_records(&self, order: SortOrder) -> Result<Vec<CleaningInventory>>;
    async fn records_for_devices(&self, devices: &[Device], order: SortOrder) -> Result<Vec<CleaningInventory>>;
    async fn latest_for_device(&self, device: &Device) -> Result<Option<CleaningInventory>>;

    /// Insert a single record atomically.
    async fn insert(&self, record: NewRecord) -> Result<CleaningInventory>;
    /// Insert several records with one statement: either all of them land or none does.
    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<u64>;
    /// Remove every record. Returns the number of rows deleted.
    async fn delete_all(&self) -> Result<u64>;

    async fn register_observer(&self, observer: Arc<dyn StoreObserver>);
    /// A stream of change notifications. Subscribers that fall behind get a lag error instead of the missed items.
    fn changes(&self) -> BroadcastStream<StoreChange>;
}

/// Gets told about every change a store commits.
#[async_trait]
pub trait StoreObserver: Send + Sync + 'static {
    async fn on_change(&self, _change: &StoreChange) {}
    async fn on_error(&self, _error: &InventoryError) {}
}

/// Turns a summary into something printable.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, summary: &Summary, catalog: &Catalog) -> Result<Artifact>;
}

/// Durable storage for rendered reports.
#[async_trait]
pub trait Archive: Send + Sync {
    /// Store the artifact under the given name. Name collisions must not overwrite an existing artifact.
    async fn store(&self, filename: &str, artifact: &Artifact) -> Result<ArchivedReport>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivedReport {
    /// Where the artifact ended up. For a directory archive this is a file path.
    pub location: String,
    /// The name actually used, which may differ from the requested one.
    pub filename: String,
    pub size:     usize,
}
