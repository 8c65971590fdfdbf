//! Runtime settings shared by the service operations.
use crate::aggregate::SummableGroup;
use crate::catalog::Catalog;
use crate::catalog::DEFAULT_GROUP_LABEL;
use crate::catalog::DEFAULT_GROUP_MEMBERS;
use crate::report::DEFAULT_TITLE;
use crate::types::GroupLabel;
use crate::types::Result;

pub const DEFAULT_REPORTER: &str = "Usuario MPDL";
pub const DEFAULT_SYSTEM_ACTOR: &str = "Sistema (reinicio)";
pub const DEFAULT_ARCHIVE_PREFIX: &str = "Productos";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Label of the summable group; the consolidated view is named after it.
    pub group_label:    String,
    /// Exact names of the devices summed into the consolidated view.
    pub group_members:  Vec<String>,
    /// Who submitted readings are attributed to.
    pub reporter:       String,
    /// Who reset readings are attributed to.
    pub system_actor:   String,
    pub archive_prefix: String,
    pub report_title:   String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            group_label:    DEFAULT_GROUP_LABEL.to_string(),
            group_members:  DEFAULT_GROUP_MEMBERS.iter().map(|m| m.to_string()).collect(),
            reporter:       DEFAULT_REPORTER.to_string(),
            system_actor:   DEFAULT_SYSTEM_ACTOR.to_string(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            report_title:   DEFAULT_TITLE.to_string(),
        }
    }
}

impl Settings {
    pub fn group_label(&self) -> GroupLabel {
        GroupLabel::new(&self.group_label)
    }

    pub fn summable_group(&self, catalog: &Catalog) -> Result<SummableGroup> {
        Ok(SummableGroup::from_names(self.group_label(), &self.group_members)?.with_free_text_id(catalog.free_text_id()))
    }
}
