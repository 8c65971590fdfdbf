//! User-facing operations: submitting readings, viewing current quantities, summaries, reports, reset and archive.
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Local;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::aggregate::consolidate;
use crate::aggregate::latest_per_device;
use crate::aggregate::readings_from_rows;
use crate::aggregate::ConsolidatedRecord;
use crate::aggregate::ProductQuantity;
use crate::aggregate::Quantity;
use crate::aggregate::Reading;
use crate::aggregate::Summary;
use crate::aggregate::SummableGroup;
use crate::archive::archive_filename;
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::store::NewRecord;
use crate::traits::Archive;
use crate::traits::ArchivedReport;
use crate::traits::InventoryStore;
use crate::traits::ReportRenderer;
use crate::types::Device;
use crate::types::DeviceTarget;
use crate::types::InventoryError;
use crate::types::Result;
use crate::types::SortOrder;

/// Outcome of a reset: which devices got a zeroed reading and which didn't.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResetOutcome {
    pub succeeded: Vec<Device>,
    pub failed:    Vec<(Device, String)>,
}

impl ResetOutcome {
    /// `true` if every device was reset.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveOutcome {
    pub archived: ArchivedReport,
    /// `None` when the reset was not requested.
    pub reset:    Option<ResetOutcome>,
}

#[derive(Debug)]
pub struct InventoryService<S: InventoryStore> {
    store:    Arc<S>,
    settings: Settings,
    catalog:  Catalog,
    group:    SummableGroup,
}

impl<S: InventoryStore> InventoryService<S> {
    pub fn new(store: Arc<S>, settings: Settings, catalog: Catalog) -> Result<Self> {
        let group = settings.summable_group(&catalog)?;
        Ok(Self {
            store,
            settings,
            catalog,
            group,
        })
    }

    pub fn store(&self) -> Arc<S> {
        self.store.clone()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn group(&self) -> &SummableGroup {
        &self.group
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// Turn the entry form into the product list that gets stored. Empty and zero quantities are dropped; the free
    /// text entry is kept only when it says something.
    pub fn form_to_products(&self, form: &BTreeMap<String, String>) -> Vec<ProductQuantity> {
        form.iter()
            .filter(|(product_id, quantity)| {
                if self.catalog.is_free_text(product_id) {
                    !quantity.trim().is_empty()
                }
                else {
                    let quantity = quantity.trim();
                    !quantity.is_empty() && quantity != "0"
                }
            })
            .map(|(product_id, quantity)| ProductQuantity::new(product_id, quantity.trim()))
            .collect()
    }

    /// Record a new reading for a device. The consolidated view can't be passed here: only a [`Device`] is accepted.
    #[instrument(level = "debug", skip(self, form), fields(device = %device))]
    pub async fn submit_reading(&self, device: &Device, form: &BTreeMap<String, String>) -> Result<Reading> {
        let products = self.form_to_products(form);
        if products.is_empty() {
            return Err(InventoryError::EmptyReading(device.to_string()));
        }

        let row = self
            .store
            .insert(NewRecord {
                device: device.clone(),
                products,
                reported_by: self.settings.reporter.clone(),
                date: Self::today().format("%Y-%m-%d").to_string(),
            })
            .await
            .inspect_err(|err| error!("Error saving inventory for {device}: {err}"))?;

        info!("Inventory #{} saved for {device}", row.id);
        Reading::try_from(row)
    }

    /// The latest reading of a single device, if it has any.
    pub async fn latest_reading(&self, device: &Device) -> Result<Option<Reading>> {
        let Some(row) = self.store.latest_for_device(device).await?
        else {
            return Ok(None);
        };
        match Reading::try_from(row) {
            Ok(reading) => Ok(Some(reading)),
            Err(err) => {
                warn!("{err}; treating {device} as having no reading");
                Ok(None)
            }
        }
    }

    /// Sum of the latest readings of the group members; `None` if none of them has reported yet.
    #[instrument(level = "debug", skip(self))]
    pub async fn consolidated(&self) -> Result<Option<ConsolidatedRecord>> {
        let members = self.group.members().iter().cloned().collect::<Vec<_>>();
        let rows = self.store.records_for_devices(&members, SortOrder::Descending).await?;
        let (readings, _) = readings_from_rows(rows);
        Ok(consolidate(&latest_per_device(readings), &self.group))
    }

    /// Quantities to show for a target, keyed by product id.
    ///
    /// For a regular device this is its latest reading as entered. For the consolidated view every numeric catalog
    /// product is listed, with zero for those nobody reported.
    pub async fn current_quantities(&self, target: &DeviceTarget) -> Result<BTreeMap<String, String>> {
        match target {
            DeviceTarget::Regular(device) => Ok(self
                .latest_reading(device)
                .await?
                .map(|r| r.quantities())
                .unwrap_or_default()),
            DeviceTarget::Consolidated(_) => {
                let consolidated = self.consolidated().await?;
                let mut quantities = self
                    .catalog
                    .numeric_ids()
                    .map(|id| (id.to_string(), "0".to_string()))
                    .collect::<BTreeMap<_, _>>();
                if let Some(record) = consolidated {
                    for (id, sum) in record.products {
                        quantities.insert(id, sum.to_string());
                    }
                }
                Ok(quantities)
            }
        }
    }

    /// Latest reading per device plus the consolidated record.
    #[instrument(level = "debug", skip(self))]
    pub async fn summary(&self) -> Result<Summary> {
        let rows = self.store.all_records(SortOrder::Descending).await?;
        let summary = Summary::from_rows(rows, &self.group);
        if summary.skipped > 0 {
            warn!("{} malformed inventory record(s) left out of the summary", summary.skipped);
        }
        Ok(summary)
    }

    /// Render the summary. Fails with [`InventoryError::NoData`] when there is nothing to report.
    pub async fn generate_report(&self, renderer: &dyn ReportRenderer) -> Result<(Summary, crate::report::Artifact)> {
        let summary = self.summary().await?;
        if summary.is_empty() {
            return Err(InventoryError::NoData);
        }
        let artifact = renderer.render(&summary, &self.catalog)?;
        Ok((summary, artifact))
    }

    /// Append a zeroed reading for every device that has one. Devices are handled one by one; a failure on one of
    /// them doesn't stop the rest.
    #[instrument(level = "debug", skip(self))]
    pub async fn reset_all(&self) -> Result<ResetOutcome> {
        let summary = self.summary().await?;
        let date = Self::today().format("%Y-%m-%d").to_string();
        let mut outcome = ResetOutcome::default();

        for (device, reading) in summary.latest {
            let products = reading
                .products
                .iter()
                // Free text is not zeroed: the reset record simply leaves the note out.
                .filter(|pq| !self.catalog.is_free_text(&pq.product_id))
                .map(|pq| ProductQuantity::new(&pq.product_id, Quantity::zero()))
                .collect();

            let record = NewRecord {
                device: device.clone(),
                products,
                reported_by: self.settings.system_actor.clone(),
                date: date.clone(),
            };

            match self.store.insert(record).await {
                Ok(_) => outcome.succeeded.push(device),
                Err(err) => {
                    error!("Failed to reset {device}: {err}");
                    outcome.failed.push((device, err.to_string()));
                }
            }
        }

        if outcome.is_complete() {
            info!("Reset {} device(s)", outcome.succeeded.len());
        }
        else {
            warn!(
                "Reset incomplete: {} succeeded, {} failed",
                outcome.succeeded.len(),
                outcome.failed.len()
            );
        }
        Ok(outcome)
    }

    /// Render the report, store it in the archive and, if asked to, reset all devices afterwards.
    #[instrument(level = "debug", skip(self, renderer, archive))]
    pub async fn archive_report(
        &self,
        renderer: &dyn ReportRenderer,
        archive: &dyn Archive,
        reset: bool,
    ) -> Result<ArchiveOutcome> {
        let (_, artifact) = self.generate_report(renderer).await?;
        let filename = archive_filename(&self.settings.archive_prefix, Self::today(), artifact.extension);
        let archived = archive.store(&filename, &artifact).await?;
        info!("Archived {} ({} bytes)", archived.location, archived.size);

        let reset = if reset {
            Some(self.reset_all().await.inspect_err(|err| {
                error!("Report archived at {}, but the reset failed: {err}", archived.location)
            })?)
        }
        else {
            None
        };

        Ok(ArchiveOutcome { archived, reset })
    }

    /// Delete every record.
    #[instrument(level = "debug", skip(self))]
    pub async fn purge(&self) -> Result<u64> {
        let rows = self.store.delete_all().await?;
        info!("Purged {rows} inventory record(s)");
        Ok(rows)
    }
}
