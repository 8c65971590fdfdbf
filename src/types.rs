use std::fmt::Display;

use sea_orm::DbErr;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = InventoryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Cli(#[from] clap::Error),

    #[error("There are no inventories to report")]
    NoData,

    #[error("Invalid device name {0:?}")]
    InvalidDevice(String),

    #[error("'{0}' is a consolidated view and cannot be written to")]
    ConsolidatedTarget(String),

    #[error("Nothing to save for device '{0}': all quantities are empty")]
    EmptyReading(String),

    #[error("Malformed inventory record #{id}: {reason}")]
    Malformed { id: i32, reason: String },

    #[error("Report rendering failed: {0}")]
    Render(String),

    #[error("Archiving failed: {0}")]
    Archive(String),

    #[error("{0}")]
    Other(String),
}

/// Produce an [`InventoryError::Other`] from a format string.
#[macro_export]
macro_rules! inverr {
    ($($fmt:tt)+) => {
        $crate::types::InventoryError::Other(format!($($fmt)+))
    };
}

pub use crate::inverr;

/// A physical location whose stock is tracked. Only regular devices can be written to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Device(String);

impl Device {
    pub fn new<S: AsRef<str>>(name: S) -> Result<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(InventoryError::InvalidDevice(name.to_string()));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Device {
    type Error = InventoryError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.0
    }
}

impl AsRef<str> for Device {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name of a group of sibling devices that are summed up into a consolidated view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupLabel(String);

impl GroupLabel {
    pub fn new<S: ToString>(label: S) -> Self {
        Self(label.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The pseudo-device name under which the consolidated view is shown.
    pub fn consolidated_name(&self) -> String {
        format!("{} (Consolidated)", self.0)
    }
}

impl Display for GroupLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a user picks in the device selector: either a real device or the consolidated view of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceTarget {
    Regular(Device),
    Consolidated(GroupLabel),
}

impl DeviceTarget {
    /// Resolve a user-supplied name. Both the bare group label and its consolidated name select the consolidated
    /// view.
    pub fn resolve<S: AsRef<str>>(name: S, group: &GroupLabel) -> Result<Self> {
        let name = name.as_ref().trim();
        if name == group.as_str() || name == group.consolidated_name() {
            Ok(Self::Consolidated(group.clone()))
        }
        else {
            Ok(Self::Regular(Device::new(name)?))
        }
    }

    /// Returns the device only if the target can be written to.
    pub fn writable(&self) -> Result<&Device> {
        match self {
            Self::Regular(device) => Ok(device),
            Self::Consolidated(label) => Err(InventoryError::ConsolidatedTarget(label.consolidated_name())),
        }
    }
}

impl Display for DeviceTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Regular(device) => write!(f, "{device}"),
            Self::Consolidated(label) => f.write_str(&label.consolidated_name()),
        }
    }
}

/// Sort direction for queries over the creation timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_name_is_trimmed_and_required() {
        assert_eq!(Device::new("  LAC1 ").unwrap().as_str(), "LAC1");
        assert!(matches!(Device::new("   "), Err(InventoryError::InvalidDevice(_))));
    }

    #[test]
    fn consolidated_target_is_not_writable() {
        let group = GroupLabel::new("LAC");
        let target = DeviceTarget::resolve("LAC (Consolidated)", &group).unwrap();
        assert_eq!(target, DeviceTarget::Consolidated(group.clone()));
        assert!(matches!(target.writable(), Err(InventoryError::ConsolidatedTarget(_))));

        let target = DeviceTarget::resolve("LAC3", &group).unwrap();
        assert_eq!(target.writable().unwrap().as_str(), "LAC3");
    }
}
