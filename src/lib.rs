//! # cleaning-inventory
//!
//! Inventory of cleaning products kept at a set of locations ("devices").
//!
//! Every time somebody counts the stock of a device, the count is stored as a new record. Records are never
//! updated: the current state of a device is simply its most recent record. On top of that the crate provides:
//!
//! - a consolidated view of a fixed group of sibling devices, computed on demand by summing their latest counts;
//! - a reset that appends a zeroed record for every device, reporting per-device failures instead of giving up on
//!   the first one;
//! - printable summary reports in text, HTML and JSON, and a directory archive for them;
//! - change notifications, used to keep a live summary up to date.
//!
//! # Storage
//!
//! Records live in a single `cleaning_inventories` table accessed through [SeaORM](https://www.sea-ql.org/SeaORM/).
//! SQLite is supported with the `sqlite` feature (on by default), PostgreSQL with `pg`. The schema is created by the
//! bundled migration the first time a store is [prepared](store::DbStore::prepare).
//!
//! # Example
//!
//! ```no_run
//! # use std::collections::BTreeMap;
//! # use std::sync::Arc;
//! # use cleaning_inventory::prelude::*;
//! # use cleaning_inventory::db::driver::sqlite::Sqlite;
//! # async fn example() -> cleaning_inventory::types::Result<()> {
//! let driver = Sqlite::connect(std::path::Path::new("inventory.db")).await?;
//! let store = Arc::new(DbStore::new(Arc::new(driver)));
//! store.prepare().await?;
//!
//! let service = InventoryService::new(store, Settings::default(), Catalog::default())?;
//! let form = BTreeMap::from([("lejia".to_string(), "3".to_string())]);
//! service.submit_reading(&Device::new("LAC1")?, &form).await?;
//!
//! if let Some(consolidated) = service.consolidated().await? {
//!     println!("{}: {} bottles of bleach", consolidated.device_name(), consolidated.quantity_of("lejia"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod app;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod db;
pub mod report;
pub mod service;
pub mod store;
pub mod traits;
pub mod types;
pub mod watcher;

#[doc(inline)]
pub use service::InventoryService;
#[doc(inline)]
pub use store::DbStore;

pub mod prelude {
    pub use crate::aggregate::ConsolidatedRecord;
    pub use crate::aggregate::Reading;
    pub use crate::aggregate::Summary;
    pub use crate::aggregate::SummableGroup;
    pub use crate::archive::DirArchive;
    pub use crate::catalog::Catalog;
    pub use crate::config::Settings;
    pub use crate::report::Artifact;
    pub use crate::report::ReportFormat;
    pub use crate::service::InventoryService;
    pub use crate::store::DbStore;
    pub use crate::traits::*;
    pub use crate::types::*;
    pub use crate::watcher::SummaryWatcher;
}
