//! Plain-text report with ASCII tables.
use std::fmt::Write;

use chrono::Utc;
use comfy_table::presets::ASCII_FULL_CONDENSED;
use comfy_table::CellAlignment;
use comfy_table::Table;

use crate::aggregate::ConsolidatedRecord;
use crate::aggregate::Reading;
use crate::aggregate::Summary;
use crate::catalog::Catalog;
use crate::traits::ReportRenderer;
use crate::types::InventoryError;
use crate::types::Result;

use super::timestamp;
use super::Artifact;

#[derive(Debug, Clone)]
pub struct TextRenderer {
    title: String,
}

impl TextRenderer {
    pub fn new<S: ToString>(title: S) -> Self {
        Self {
            title: title.to_string(),
        }
    }

    fn product_table<I>(rows: I) -> Table
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = Table::new();
        table.load_preset(ASCII_FULL_CONDENSED).set_header(["Product", "Quantity"]);
        for (name, quantity) in rows {
            table.add_row([name, quantity]);
        }
        if let Some(column) = table.column_mut(1) {
            column.set_cell_alignment(CellAlignment::Right);
        }
        table
    }

    fn device_section(out: &mut String, reading: &Reading, catalog: &Catalog) -> std::fmt::Result {
        writeln!(out, "Device: {}", reading.device)?;
        writeln!(out, "Reported by {} on {}", reading.reported_by, reading.date)?;
        if reading.products.is_empty() {
            writeln!(out, "  No products were recorded for this device.")?;
        }
        else {
            let rows = reading.products.iter().map(|pq| {
                (
                    catalog.display_name(&pq.product_id).to_string(),
                    pq.quantity.to_string(),
                )
            });
            writeln!(out, "{}", Self::product_table(rows))?;
        }
        writeln!(out)
    }

    fn consolidated_section(out: &mut String, record: &ConsolidatedRecord, catalog: &Catalog) -> std::fmt::Result {
        writeln!(out, "{}", record.device_name())?;
        let members = record.members.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
        writeln!(out, "Sum of the latest readings of: {members}")?;

        // Catalog products first, in catalog order, then anything the catalog doesn't know about.
        let mut rows = catalog
            .numeric_ids()
            .map(|id| (catalog.display_name(id).to_string(), record.quantity_of(id).to_string()))
            .collect::<Vec<_>>();
        rows.extend(
            record
                .products
                .iter()
                .filter(|(id, _)| catalog.name_of(id).is_none())
                .map(|(id, qty)| (id.clone(), qty.to_string())),
        );
        writeln!(out, "{}", Self::product_table(rows))?;
        writeln!(out, "Computed at {}", timestamp(&record.computed_at))
    }

    fn write_into(&self, out: &mut String, summary: &Summary, catalog: &Catalog) -> std::fmt::Result {
        writeln!(out, "{}", self.title)?;
        writeln!(out, "{}", "=".repeat(self.title.chars().count()))?;
        writeln!(out, "Generated at {}", timestamp(&Utc::now()))?;
        writeln!(out)?;

        if summary.is_empty() {
            writeln!(out, "No inventory data available.")?;
        }
        for reading in summary.ordered() {
            Self::device_section(out, reading, catalog)?;
        }
        if let Some(record) = &summary.consolidated {
            Self::consolidated_section(out, record, catalog)?;
        }
        Ok(())
    }
}

impl ReportRenderer for TextRenderer {
    fn render(&self, summary: &Summary, catalog: &Catalog) -> Result<Artifact> {
        let mut out = String::new();
        self.write_into(&mut out, summary, catalog)
            .map_err(|e| InventoryError::Render(e.to_string()))?;

        Ok(Artifact {
            bytes:        out.into_bytes(),
            content_type: "text/plain; charset=utf-8",
            extension:    "txt",
        })
    }
}
