//! Machine-readable report.
use serde::Serialize;

use crate::aggregate::ConsolidatedRecord;
use crate::aggregate::Reading;
use crate::aggregate::Summary;
use crate::catalog::Catalog;
use crate::traits::ReportRenderer;
use crate::types::Result;

use super::Artifact;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

#[derive(Serialize)]
struct JsonReport<'a> {
    devices:      Vec<&'a Reading>,
    consolidated: Option<&'a ConsolidatedRecord>,
    catalog:      &'a Catalog,
}

impl ReportRenderer for JsonRenderer {
    fn render(&self, summary: &Summary, catalog: &Catalog) -> Result<Artifact> {
        let report = JsonReport {
            devices: summary.ordered().collect(),
            consolidated: summary.consolidated.as_ref(),
            catalog,
        };

        Ok(Artifact {
            bytes:        serde_json::to_vec_pretty(&report)?,
            content_type: "application/json",
            extension:    "json",
        })
    }
}
