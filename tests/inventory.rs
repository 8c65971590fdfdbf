#![cfg(feature = "sqlite")]

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cleaning_inventory::catalog::Catalog;
use cleaning_inventory::catalog::FREE_TEXT_PRODUCT_ID;
use cleaning_inventory::config::Settings;
use cleaning_inventory::config::DEFAULT_REPORTER;
use cleaning_inventory::config::DEFAULT_SYSTEM_ACTOR;
use cleaning_inventory::db::driver::DatabaseDriver;
use cleaning_inventory::db::entity::CleaningInventory;
use cleaning_inventory::db::entity::CleaningInventoryActive;
use cleaning_inventory::service::InventoryService;
use cleaning_inventory::store::NewRecord;
use cleaning_inventory::store::StoreChange;
use cleaning_inventory::traits::InventoryStore;
use cleaning_inventory::traits::StoreObserver;
use cleaning_inventory::types::inverr;
use cleaning_inventory::types::Device;
use cleaning_inventory::types::DeviceTarget;
use cleaning_inventory::types::GroupLabel;
use cleaning_inventory::types::InventoryError;
use cleaning_inventory::types::Result;
use cleaning_inventory::types::SortOrder;
use cleaning_inventory::watcher::SummaryWatcher;
use common::device;
use common::fixture;
use common::form;
use common::insert_all;
use common::record;
use common::Store;
use sea_orm::ActiveModelTrait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::ActiveValue::Set;
use tokio::sync::Mutex;
use tokio_stream::wrappers::BroadcastStream;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn lac_group_is_consolidated() -> TestResult {
    let fx = fixture().await?;
    insert_all(
        &*fx.store,
        vec![
            record("LAC1", &[("papel_higienico", "3"), ("lejia", "0")]),
            record("LAC2", &[("papel_higienico", "2"), ("lejia", "5")]),
            record("MM", &[("papel_higienico", "40")]),
        ],
    )
    .await?;

    let consolidated = fx.service.consolidated().await?.expect("LAC members have readings");
    assert_eq!(consolidated.device_name(), "LAC (Consolidated)");
    assert_eq!(consolidated.quantity_of("papel_higienico"), 5);
    assert_eq!(consolidated.quantity_of("lejia"), 5);
    assert_eq!(consolidated.members, vec![device("LAC1"), device("LAC2")]);

    let summary = fx.service.summary().await?;
    assert_eq!(summary.latest.len(), 3);
    assert_eq!(
        summary.consolidated.as_ref().map(|c| &c.products),
        Some(&consolidated.products)
    );

    Ok(())
}

#[tokio::test]
async fn newer_reading_replaces_older_one() -> TestResult {
    let fx = fixture().await?;
    insert_all(
        &*fx.store,
        vec![
            record("LAC1", &[("lejia", "9")]),
            record("LAC1", &[("lejia", "1")]),
            record("LAC2", &[("lejia", "2")]),
        ],
    )
    .await?;

    let consolidated = fx.service.consolidated().await?.unwrap();
    assert_eq!(consolidated.quantity_of("lejia"), 3);

    let current = fx.service.current_quantities(&DeviceTarget::Regular(device("LAC1"))).await?;
    assert_eq!(current, form(&[("lejia", "1")]));

    Ok(())
}

#[tokio::test]
async fn unparsable_quantities_are_not_summed() -> TestResult {
    let fx = fixture().await?;
    fx.service
        .submit_reading(&device("LAC1"), &form(&[("lejia", "abc"), ("bayetas", "2")]))
        .await?;
    fx.service
        .submit_reading(&device("LAC2"), &form(&[("lejia", "2"), (FREE_TEXT_PRODUCT_ID, "7 mopas")]))
        .await?;

    let consolidated = fx.service.consolidated().await?.unwrap();
    assert_eq!(consolidated.quantity_of("lejia"), 2);
    assert_eq!(consolidated.quantity_of("bayetas"), 2);
    assert!(!consolidated.products.contains_key(FREE_TEXT_PRODUCT_ID));

    // The raw text is still what the device shows.
    let current = fx.service.current_quantities(&DeviceTarget::Regular(device("LAC1"))).await?;
    assert_eq!(current["lejia"], "abc");

    Ok(())
}

#[tokio::test]
async fn consolidated_view_lists_every_numeric_product() -> TestResult {
    let fx = fixture().await?;
    let label = GroupLabel::new("LAC");
    let target = DeviceTarget::resolve("LAC (Consolidated)", &label)?;

    assert!(fx.service.consolidated().await?.is_none());
    let empty = fx.service.current_quantities(&target).await?;
    let catalog = Catalog::default();
    assert_eq!(empty.len(), catalog.numeric_ids().count());
    assert!(empty.values().all(|q| q == "0"));
    assert!(!empty.contains_key(FREE_TEXT_PRODUCT_ID));

    fx.service
        .submit_reading(&device("LAC3"), &form(&[("guantes", "4")]))
        .await?;
    let current = fx.service.current_quantities(&target).await?;
    assert_eq!(current["guantes"], "4");
    assert_eq!(current["lejia"], "0");

    Ok(())
}

#[tokio::test]
async fn submit_drops_empty_entries() -> TestResult {
    let fx = fixture().await?;

    let reading = fx
        .service
        .submit_reading(
            &device("CAI"),
            &form(&[
                ("lejia", "2"),
                ("fregasuelos", "0"),
                ("bayetas", ""),
                (FREE_TEXT_PRODUCT_ID, "   "),
            ]),
        )
        .await?;
    assert_eq!(reading.quantities(), form(&[("lejia", "2")]));
    assert_eq!(reading.reported_by, DEFAULT_REPORTER);
    assert_eq!(reading.date.len(), "YYYY-MM-DD".len());

    let err = fx
        .service
        .submit_reading(&device("CAI"), &form(&[("lejia", "0"), (FREE_TEXT_PRODUCT_ID, "")]))
        .await
        .unwrap_err();
    assert!(matches!(err, InventoryError::EmptyReading(_)));
    assert_eq!(fx.store.all_records(SortOrder::Ascending).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn consolidated_view_is_read_only() -> TestResult {
    let label = GroupLabel::new("LAC");
    for name in ["LAC", "LAC (Consolidated)"] {
        let target = DeviceTarget::resolve(name, &label)?;
        assert!(matches!(target.writable(), Err(InventoryError::ConsolidatedTarget(_))));
    }
    Ok(())
}

#[tokio::test]
async fn reset_appends_zeroed_readings() -> TestResult {
    let fx = fixture().await?;
    insert_all(
        &*fx.store,
        vec![
            record("A", &[("jabon_manos", "4"), (FREE_TEXT_PRODUCT_ID, "cubo roto")]),
            record("B", &[("lejia", "1"), ("bayetas", "3")]),
        ],
    )
    .await?;

    let outcome = fx.service.reset_all().await?;
    assert!(outcome.is_complete());
    assert_eq!(outcome.succeeded, vec![device("A"), device("B")]);

    let rows = fx.store.all_records(SortOrder::Ascending).await?;
    assert_eq!(rows.iter().filter(|r| r.device == "A").count(), 2, "history is kept");

    let latest = fx.service.latest_reading(&device("A")).await?.unwrap();
    assert_eq!(latest.quantities(), form(&[("jabon_manos", "0")]));
    assert_eq!(latest.reported_by, DEFAULT_SYSTEM_ACTOR);

    let latest = fx.service.latest_reading(&device("B")).await?.unwrap();
    assert_eq!(latest.quantities(), form(&[("bayetas", "0"), ("lejia", "0")]));

    Ok(())
}

#[tokio::test]
async fn reset_of_empty_inventory_does_nothing() -> TestResult {
    let fx = fixture().await?;
    let outcome = fx.service.reset_all().await?;
    assert!(outcome.succeeded.is_empty());
    assert!(outcome.is_complete());
    assert!(fx.store.all_records(SortOrder::Ascending).await?.is_empty());
    Ok(())
}

/// Fails every insert for one device.
#[derive(Debug)]
struct FlakyStore {
    inner:   Arc<Store>,
    failing: Device,
}

#[async_trait]
impl InventoryStore for FlakyStore {
    async fn all_records(&self, order: SortOrder) -> Result<Vec<CleaningInventory>> {
        self.inner.all_records(order).await
    }

    async fn records_for_devices(&self, devices: &[Device], order: SortOrder) -> Result<Vec<CleaningInventory>> {
        self.inner.records_for_devices(devices, order).await
    }

    async fn latest_for_device(&self, device: &Device) -> Result<Option<CleaningInventory>> {
        self.inner.latest_for_device(device).await
    }

    async fn insert(&self, record: NewRecord) -> Result<CleaningInventory> {
        if record.device == self.failing {
            return Err(inverr!("simulated outage for {}", record.device));
        }
        self.inner.insert(record).await
    }

    async fn insert_many(&self, records: Vec<NewRecord>) -> Result<u64> {
        self.inner.insert_many(records).await
    }

    async fn delete_all(&self) -> Result<u64> {
        self.inner.delete_all().await
    }

    async fn register_observer(&self, observer: Arc<dyn StoreObserver>) {
        self.inner.register_observer(observer).await
    }

    fn changes(&self) -> BroadcastStream<StoreChange> {
        self.inner.changes()
    }
}

#[tokio::test]
async fn reset_reports_partial_failure() -> TestResult {
    let fx = fixture().await?;
    insert_all(
        &*fx.store,
        vec![
            record("A", &[("lejia", "1")]),
            record("B", &[("lejia", "2")]),
            record("C", &[("lejia", "3")]),
        ],
    )
    .await?;

    let flaky = Arc::new(FlakyStore {
        inner:   fx.store.clone(),
        failing: device("B"),
    });
    let service = InventoryService::new(flaky, Settings::default(), Catalog::default())?;

    let outcome = service.reset_all().await?;
    assert!(!outcome.is_complete());
    assert_eq!(outcome.succeeded, vec![device("A"), device("C")]);
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, device("B"));
    assert!(outcome.failed[0].1.contains("simulated outage"));

    // B keeps its last real reading, the others are zeroed.
    assert_eq!(
        service.latest_reading(&device("B")).await?.unwrap().quantities(),
        form(&[("lejia", "2")])
    );
    assert_eq!(
        service.latest_reading(&device("C")).await?.unwrap().quantities(),
        form(&[("lejia", "0")])
    );

    Ok(())
}

#[derive(Debug, Default)]
struct Recorder {
    changes: Mutex<Vec<StoreChange>>,
}

#[async_trait]
impl StoreObserver for Recorder {
    async fn on_change(&self, change: &StoreChange) {
        self.changes.lock().await.push(change.clone());
    }
}

#[tokio::test]
async fn observers_see_every_change() -> TestResult {
    let fx = fixture().await?;
    let recorder = Arc::new(Recorder::default());
    fx.store.register_observer(recorder.clone()).await;

    let reading = fx.service.submit_reading(&device("MF"), &form(&[("lejia", "1")])).await?;
    let inserted = fx
        .store
        .insert_many(vec![record("MM", &[("lejia", "1")]), record("CAI", &[("lejia", "2")])])
        .await?;
    assert_eq!(inserted, 2);
    let purged = fx.service.purge().await?;
    assert_eq!(purged, 3);

    let changes = recorder.changes.lock().await.clone();
    assert_eq!(
        changes,
        vec![
            StoreChange::Inserted {
                id:     reading.id,
                device: device("MF"),
            },
            StoreChange::InsertedMany {
                devices: vec![device("MM"), device("CAI")],
            },
            StoreChange::Purged { rows: 3 },
        ]
    );
    assert!(changes[1].touches(&device("CAI")));
    assert!(!changes[1].touches(&device("MF")));

    assert!(fx.service.summary().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn watcher_follows_changes() -> TestResult {
    let fx = fixture().await?;
    let watcher = SummaryWatcher::start(fx.service.clone()).await?;
    assert!(watcher.current().is_empty());

    let mut updates = watcher.subscribe();
    fx.service
        .submit_reading(&device("LAC2"), &form(&[("estropajos", "6")]))
        .await?;

    tokio::time::timeout(Duration::from_secs(5), updates.changed()).await??;
    let summary = updates.borrow_and_update().clone();
    assert_eq!(summary.latest.len(), 1);
    assert_eq!(summary.consolidated.as_ref().unwrap().quantity_of("estropajos"), 6);

    fx.service.purge().await?;
    tokio::time::timeout(Duration::from_secs(5), updates.changed()).await??;
    assert!(updates.borrow_and_update().is_empty());

    watcher.shutdown();
    Ok(())
}

#[tokio::test]
async fn malformed_rows_are_skipped() -> TestResult {
    let fx = fixture().await?;
    insert_all(&*fx.store, vec![record("LAC1", &[("lejia", "2")])]).await?;

    let broken = CleaningInventoryActive {
        id:          NotSet,
        device:      Set("LAC2".to_string()),
        products:    Set(serde_json::json!({"lejia": 4})),
        reported_by: Set("somebody".to_string()),
        date:        Set("2026-10-16".to_string()),
        created_at:  Set(chrono::Utc::now()),
    };
    broken.insert(&fx.store.driver().connection()).await?;

    let summary = fx.service.summary().await?;
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.latest.len(), 1);
    assert_eq!(summary.consolidated.unwrap().quantity_of("lejia"), 2);

    let current = fx.service.current_quantities(&DeviceTarget::Regular(device("LAC2"))).await?;
    assert_eq!(current, BTreeMap::new());

    Ok(())
}
