#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use cleaning_inventory::aggregate::ProductQuantity;
use cleaning_inventory::catalog::Catalog;
use cleaning_inventory::config::Settings;
use cleaning_inventory::db::driver::sqlite::Sqlite;
use cleaning_inventory::service::InventoryService;
use cleaning_inventory::store::DbStore;
use cleaning_inventory::store::NewRecord;
use cleaning_inventory::traits::InventoryStore;
use cleaning_inventory::types::Device;
use cleaning_inventory::types::Result;
use tempfile::TempDir;

pub type Store = DbStore<Sqlite>;

pub struct Fixture {
    pub tmp:     TempDir,
    pub store:   Arc<Store>,
    pub service: Arc<InventoryService<Store>>,
}

pub async fn sqlite_store(tmp: &TempDir) -> Result<Arc<Store>> {
    let driver = Sqlite::connect(&tmp.path().join("inventory.db")).await?;
    let store = Arc::new(DbStore::new(Arc::new(driver)));
    store.prepare().await?;
    Ok(store)
}

pub async fn fixture() -> Result<Fixture> {
    let tmp = tempfile::Builder::new().prefix("cleaning-inventory").tempdir()?;
    let store = sqlite_store(&tmp).await?;
    let service = Arc::new(InventoryService::new(
        store.clone(),
        Settings::default(),
        Catalog::default(),
    )?);
    Ok(Fixture { tmp, store, service })
}

pub fn device(name: &str) -> Device {
    Device::new(name).unwrap()
}

pub fn form(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(id, qty)| (id.to_string(), qty.to_string()))
        .collect()
}

pub fn record(name: &str, entries: &[(&str, &str)]) -> NewRecord {
    NewRecord {
        device:      device(name),
        products:    entries.iter().map(|(id, qty)| ProductQuantity::new(*id, *qty)).collect(),
        reported_by: "tester".to_string(),
        date:        "2026-10-16".to_string(),
    }
}

pub async fn insert_all<S: InventoryStore>(store: &S, records: Vec<NewRecord>) -> Result<()> {
    for record in records {
        store.insert(record).await?;
    }
    Ok(())
}
