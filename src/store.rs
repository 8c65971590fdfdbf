//! SeaORM-backed [`InventoryStore`].
use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::*;
use sea_orm::query::*;
use sea_orm::ActiveValue::NotSet;
use sea_orm::ActiveValue::Set;
use sea_orm::Select;
use sea_orm_migration::MigratorTrait;
use tokio::sync::broadcast;
use tokio::sync::RwLock;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;
use tracing::instrument;

use crate::aggregate::ProductQuantity;
use crate::db::driver::DatabaseDriver;
use crate::db::entity::CleaningInventories;
use crate::db::entity::CleaningInventory;
use crate::db::entity::CleaningInventoryActive;
use crate::db::entity::CleaningInventoryColumn as Column;
use crate::db::migrations::Migrator;
use crate::traits::InventoryStore;
use crate::traits::StoreObserver;
use crate::types::Device;
use crate::types::InventoryError;
use crate::types::Result;
use crate::types::SortOrder;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// A record about to be inserted. The store stamps the creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub device:      Device,
    pub products:    Vec<ProductQuantity>,
    pub reported_by: String,
    pub date:        String,
}

impl NewRecord {
    fn into_active_model(self) -> Result<CleaningInventoryActive> {
        Ok(CleaningInventoryActive {
            id:          NotSet,
            device:      Set(self.device.into()),
            products:    Set(serde_json::to_value(self.products)?),
            reported_by: Set(self.reported_by),
            date:        Set(self.date),
            created_at:  Set(Utc::now()),
        })
    }
}

/// What changed in the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    Inserted { id: i32, device: Device },
    InsertedMany { devices: Vec<Device> },
    Purged { rows: u64 },
}

impl StoreChange {
    /// Whether the change may affect the given device.
    pub fn touches(&self, device: &Device) -> bool {
        match self {
            Self::Inserted { device: d, .. } => d == device,
            Self::InsertedMany { devices } => devices.contains(device),
            Self::Purged { .. } => true,
        }
    }
}

pub struct DbStore<D: DatabaseDriver> {
    driver:    Arc<D>,
    observers: RwLock<Vec<Arc<dyn StoreObserver>>>,
    changes:   broadcast::Sender<StoreChange>,
}

impl<D: DatabaseDriver> DbStore<D> {
    pub fn new(driver: Arc<D>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            driver,
            observers: RwLock::new(Vec::new()),
            changes,
        }
    }

    pub fn driver(&self) -> Arc<D> {
        self.driver.clone()
    }

    /// Configure the connection and bring the schema up to date.
    #[instrument(level = "debug", skip(self), fields(driver = self.driver.name()))]
    pub async fn prepare(&self) -> Result<()> {
        self.driver.configure().await?;
        Migrator::up(&self.driver.connection(), None).await?;
        Ok(())
    }

    async fn publish(&self, change: StoreChange) {
        debug!("Store change: {change:?}");
        for observer in self.observers.read().await.iter() {
            observer.on_change(&change).await;
        }
        // Nobody listening is fine.
        let _ = self.changes.send(change);
    }

    async fn report_error(&self, error: InventoryError) -> InventoryError {
        for observer in self.observers.read().await.iter() {
            observer.on_error(&error).await;
        }
        error
    }

    fn ordered(select: Select<CleaningInventories>, order: SortOrder) -> Select<CleaningInventories> {
        match order {
            SortOrder::Ascending => select.order_by_asc(Column::CreatedAt).order_by_asc(Column::Id),
            SortOrder::Descending => select.order_by_desc(Column::CreatedAt).order_by_desc(Column::Id),
        }
    }
}

impl<D: DatabaseDriver> Debug for DbStore<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DbStore<{}>", self.driver.name())
    }
}

#[async_trait]
impl<D: DatabaseDriver> InventoryStore for DbStore<D> {
    #[instrument(level = "trace", skip(self))]
    async fn all_records(&self, order: SortOrder) -> Result<Vec<CleaningInventory>> {
        Ok(Self::ordered(CleaningInventories::find(), order)
            .all(&self.driver.connection())
            .await?)
    }

    #[instrument(level = "trace", skip(self))]
    async fn records_for_devices(&self, devices: &[Device], order: SortOrder) -> Result<Vec<CleaningInventory>> {
        if devices.is_empty() {
            return Ok(Vec::new());
        }
        let names = devices.iter().map(|d| d.as_str().to_string()).collect::<Vec<_>>();
        Ok(
            Self::ordered(CleaningInventories::find().filter(Column::Device.is_in(names)), order)
                .all(&self.driver.connection())
                .await?,
        )
    }

    #[instrument(level = "trace", skip(self))]
    async fn latest_for_device(&self, device: &Device) -> Result<Option<CleaningInventory>> {
        Ok(Self::ordered(
            CleaningInventories::find().filter(Column::Device.eq(device.as_str())),
            SortOrder::Descending,
        )
        .one(&self.driver.connection())
        .await?)
    }

    #[instrument(level = "debug", skip(self, record), fields(device = %record.device))]
    async fn insert(&self, record: NewRecord) -> Result<CleaningInventory> {
        let device = record.device.clone();
        let inserted = match record.into_active_model()?.insert(&self.driver.connection()).await {
            Ok(model) => model,
            Err(err) => return Err(self.report_error(err.into()).await),
        };
        self.publish(StoreChange::Inserted {
            id: inserted.id,
            device,
        })
        .await;
        Ok(inserted)
    }

    #[instrument(level = "debug", skip(self, records), fields(count = records.len()))]
    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let devices = records.iter().map(|r| r.device.clone()).collect::<Vec<_>>();
        let models = records
            .into_iter()
            .map(NewRecord::into_active_model)
            .collect::<Result<Vec<_>>>()?;
        let count = models.len() as u64;

        if let Err(err) = CleaningInventories::insert_many(models)
            .exec_without_returning(&self.driver.connection())
            .await
        {
            return Err(self.report_error(err.into()).await);
        }

        self.publish(StoreChange::InsertedMany { devices }).await;
        Ok(count)
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete_all(&self) -> Result<u64> {
        // Some backends refuse an unconditional delete; this condition holds for every row.
        let result = match CleaningInventories::delete_many()
            .filter(Column::Id.is_not_null())
            .exec(&self.driver.connection())
            .await
        {
            Ok(result) => result,
            Err(err) => return Err(self.report_error(err.into()).await),
        };

        self.publish(StoreChange::Purged {
            rows: result.rows_affected,
        })
        .await;
        Ok(result.rows_affected)
    }

    async fn register_observer(&self, observer: Arc<dyn StoreObserver>) {
        self.observers.write().await.push(observer);
    }

    fn changes(&self) -> BroadcastStream<StoreChange> {
        BroadcastStream::new(self.changes.subscribe())
    }
}
