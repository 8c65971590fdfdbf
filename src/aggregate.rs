//! Latest-reading selection and group consolidation.
//!
//! Everything here is a pure function of the rows handed in. Rows that can't be interpreted are skipped with a
//! warning; a single bad row never prevents the rest from being aggregated.
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt::Display;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use crate::catalog::FREE_TEXT_PRODUCT_ID;
use crate::db::entity::CleaningInventory;
use crate::types::Device;
use crate::types::GroupLabel;
use crate::types::InventoryError;
use crate::types::Result;

/// A quantity as stored: clients have been writing both numbers and numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Quantity {
    Number(serde_json::Number),
    Text(String),
}

impl Quantity {
    /// The quantity as a count. Anything that isn't a non-negative integer yields `None`.
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            Self::Text(s) => s.trim().parse::<u64>().ok(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    pub fn zero() -> Self {
        Self::Text("0".to_string())
    }
}

impl Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for Quantity {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Quantity {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuantity {
    pub product_id: String,
    pub quantity:   Quantity,
}

impl ProductQuantity {
    pub fn new<S: ToString, Q: Into<Quantity>>(product_id: S, quantity: Q) -> Self {
        Self {
            product_id: product_id.to_string(),
            quantity:   quantity.into(),
        }
    }
}

/// A validated inventory row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub id:          i32,
    pub device:      Device,
    pub products:    Vec<ProductQuantity>,
    pub reported_by: String,
    pub date:        String,
    pub created_at:  DateTime<Utc>,
}

impl Reading {
    /// Readings compare by creation time first; the row id breaks ties between rows stamped with the same instant.
    pub fn recency_key(&self) -> (DateTime<Utc>, i32) {
        (self.created_at, self.id)
    }

    /// Product id to quantity text, the way the entry form is pre-filled.
    pub fn quantities(&self) -> BTreeMap<String, String> {
        self.products
            .iter()
            .map(|p| (p.product_id.clone(), p.quantity.to_string()))
            .collect()
    }
}

impl TryFrom<CleaningInventory> for Reading {
    type Error = InventoryError;

    fn try_from(row: CleaningInventory) -> Result<Self> {
        let id = row.id;
        let device = Device::new(&row.device).map_err(|_| InventoryError::Malformed {
            id,
            reason: "empty device name".to_string(),
        })?;

        let Value::Array(entries) = row.products
        else {
            return Err(InventoryError::Malformed {
                id,
                reason: "products is not a list".to_string(),
            });
        };

        let mut products = Vec::with_capacity(entries.len());
        for entry in entries {
            match serde_json::from_value::<ProductQuantity>(entry) {
                Ok(pq) => products.push(pq),
                Err(err) => warn!("Skipping unreadable product entry in record #{id} ({device}): {err}"),
            }
        }

        Ok(Self {
            id,
            device,
            products,
            reported_by: row.reported_by,
            date: row.date,
            created_at: row.created_at,
        })
    }
}

/// Convert raw rows into readings, dropping the malformed ones. Returns the readings and the number of rows skipped.
pub fn readings_from_rows<I>(rows: I) -> (Vec<Reading>, usize)
where
    I: IntoIterator<Item = CleaningInventory>,
{
    let mut skipped = 0;
    let readings = rows
        .into_iter()
        .filter_map(|row| {
            Reading::try_from(row)
                .inspect_err(|err| {
                    skipped += 1;
                    warn!("{err}; record skipped");
                })
                .ok()
        })
        .collect();
    (readings, skipped)
}

/// The current reading of every device, ordered by device name.
pub type LatestReadings = BTreeMap<Device, Reading>;

/// Pick the most recent reading for every device. Input order doesn't matter.
pub fn latest_per_device<I>(readings: I) -> LatestReadings
where
    I: IntoIterator<Item = Reading>,
{
    let mut latest = LatestReadings::new();
    for reading in readings {
        match latest.entry(reading.device.clone()) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(reading);
            }
            btree_map::Entry::Occupied(mut entry) => {
                if reading.recency_key() > entry.get().recency_key() {
                    entry.insert(reading);
                }
            }
        }
    }
    latest
}

/// A fixed set of sibling devices whose latest readings are summed up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummableGroup {
    label:        GroupLabel,
    members:      BTreeSet<Device>,
    free_text_id: String,
}

impl SummableGroup {
    pub fn new<I>(label: GroupLabel, members: I) -> Self
    where
        I: IntoIterator<Item = Device>,
    {
        Self {
            label,
            members: members.into_iter().collect(),
            free_text_id: FREE_TEXT_PRODUCT_ID.to_string(),
        }
    }

    /// Membership is taken from a plain list of names; empty names are rejected.
    pub fn from_names<I, S>(label: GroupLabel, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let members = names.into_iter().map(Device::new).collect::<Result<Vec<_>>>()?;
        Ok(Self::new(label, members))
    }

    pub fn with_free_text_id<S: ToString>(mut self, id: S) -> Self {
        self.free_text_id = id.to_string();
        self
    }

    pub fn label(&self) -> &GroupLabel {
        &self.label
    }

    pub fn members(&self) -> &BTreeSet<Device> {
        &self.members
    }

    pub fn is_member(&self, device: &Device) -> bool {
        self.members.contains(device)
    }

    pub fn free_text_id(&self) -> &str {
        &self.free_text_id
    }
}

/// Sum of the latest readings across a group. Computed on demand, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedRecord {
    pub label:       GroupLabel,
    /// Members that contributed a reading, in name order.
    pub members:     Vec<Device>,
    pub products:    BTreeMap<String, u64>,
    pub computed_at: DateTime<Utc>,
}

impl ConsolidatedRecord {
    pub fn device_name(&self) -> String {
        self.label.consolidated_name()
    }

    pub fn quantity_of(&self, product_id: &str) -> u64 {
        self.products.get(product_id).copied().unwrap_or(0)
    }
}

/// Sum the latest readings of the group members.
///
/// Returns `None` when no member has any reading at all. Only positive integer quantities are added; zeros and
/// anything unparsable are skipped, and the free-text product is never looked at. A member whose entries are all
/// skipped still counts as having reported, so an all-zero group yields an empty sum rather than `None`.
pub fn consolidate(latest: &LatestReadings, group: &SummableGroup) -> Option<ConsolidatedRecord> {
    let mut members = Vec::new();
    let mut products = BTreeMap::<String, u64>::new();

    for (device, reading) in latest.iter().filter(|(device, _)| group.is_member(device)) {
        members.push(device.clone());

        for entry in reading
            .products
            .iter()
            .filter(|pq| pq.product_id != group.free_text_id())
        {
            match entry.quantity.count() {
                Some(count) if count > 0 => {
                    let sum = products.entry(entry.product_id.clone()).or_default();
                    match sum.checked_add(count) {
                        Some(total) => *sum = total,
                        None => warn!(
                            "Quantity {count} of '{}' reported for {device} overflows the sum, ignoring it",
                            entry.product_id
                        ),
                    }
                }
                _ => {
                    debug!(
                        "Ignoring quantity '{}' of '{}' reported for {device}",
                        entry.quantity, entry.product_id
                    );
                }
            }
        }
    }

    if members.is_empty() {
        return None;
    }

    Some(ConsolidatedRecord {
        label: group.label().clone(),
        members,
        products,
        computed_at: Utc::now(),
    })
}

/// Everything a summary view or a report needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub latest:       LatestReadings,
    pub consolidated: Option<ConsolidatedRecord>,
    /// Number of rows that were skipped as malformed.
    pub skipped:      usize,
}

impl Summary {
    pub fn from_rows<I>(rows: I, group: &SummableGroup) -> Self
    where
        I: IntoIterator<Item = CleaningInventory>,
    {
        let (readings, skipped) = readings_from_rows(rows);
        let latest = latest_per_device(readings);
        let consolidated = consolidate(&latest, group);
        Self {
            latest,
            consolidated,
            skipped,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Latest readings in report order.
    pub fn ordered(&self) -> impl Iterator<Item = &Reading> {
        self.latest.values()
    }
}
