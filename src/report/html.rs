//! Printable HTML report.
use std::fmt::Write;

use chrono::Utc;

use crate::aggregate::ConsolidatedRecord;
use crate::aggregate::Reading;
use crate::aggregate::Summary;
use crate::catalog::Catalog;
use crate::traits::ReportRenderer;
use crate::types::InventoryError;
use crate::types::Result;

use super::timestamp;
use super::Artifact;

const STYLE: &str = r#"
body { font-family: Arial, sans-serif; margin: 20px; color: #1e293b; }
h1 { color: #1e7bb8; border-bottom: 1px solid #1e7bb8; padding-bottom: 6px; font-size: 20px; }
.device { margin-bottom: 24px; page-break-inside: avoid; }
.device h2 { font-size: 16px; margin: 0 0 4px 0; }
.meta { color: #4d4d4d; font-size: 12px; margin-bottom: 6px; }
.empty { color: #808080; font-size: 12px; }
.consolidated { border-top: 2px solid #1e7bb8; padding-top: 12px; }
table { border-collapse: collapse; min-width: 320px; }
th, td { border: 1px solid #cbd5e1; padding: 3px 8px; font-size: 12px; text-align: left; }
td.qty { text-align: right; }
"#;

#[derive(Debug, Clone)]
pub struct HtmlRenderer {
    title: String,
}

/// Escape text for use in element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl HtmlRenderer {
    pub fn new<S: ToString>(title: S) -> Self {
        Self {
            title: title.to_string(),
        }
    }

    fn product_table(out: &mut String, rows: &[(String, String)]) -> std::fmt::Result {
        writeln!(out, "<table><thead><tr><th>Product</th><th>Quantity</th></tr></thead><tbody>")?;
        for (name, quantity) in rows {
            writeln!(
                out,
                "<tr><td>{}</td><td class=\"qty\">{}</td></tr>",
                escape(name),
                escape(quantity)
            )?;
        }
        writeln!(out, "</tbody></table>")
    }

    fn device_section(out: &mut String, reading: &Reading, catalog: &Catalog) -> std::fmt::Result {
        writeln!(out, "<section class=\"device\">")?;
        writeln!(out, "<h2>{}</h2>", escape(reading.device.as_str()))?;
        writeln!(
            out,
            "<div class=\"meta\">Reported by {} on {}</div>",
            escape(&reading.reported_by),
            escape(&reading.date)
        )?;
        if reading.products.is_empty() {
            writeln!(out, "<div class=\"empty\">No products were recorded for this device.</div>")?;
        }
        else {
            let rows = reading
                .products
                .iter()
                .map(|pq| {
                    (
                        catalog.display_name(&pq.product_id).to_string(),
                        pq.quantity.to_string(),
                    )
                })
                .collect::<Vec<_>>();
            Self::product_table(out, &rows)?;
        }
        writeln!(out, "</section>")
    }

    fn consolidated_section(out: &mut String, record: &ConsolidatedRecord, catalog: &Catalog) -> std::fmt::Result {
        writeln!(out, "<section class=\"device consolidated\">")?;
        writeln!(out, "<h2>{}</h2>", escape(&record.device_name()))?;
        let members = record.members.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
        writeln!(
            out,
            "<div class=\"meta\">Sum of the latest readings of {}; computed at {}</div>",
            escape(&members),
            timestamp(&record.computed_at)
        )?;
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
        Self::product_table(out, &rows)?;
        writeln!(out, "</section>")
    }

    fn write_into(&self, out: &mut String, summary: &Summary, catalog: &Catalog) -> std::fmt::Result {
        let title = escape(&self.title);
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, "<html><head><meta charset=\"UTF-8\"><title>{title}</title>")?;
        writeln!(out, "<style>{STYLE}</style></head><body>")?;
        writeln!(out, "<h1>{title}</h1>")?;
        writeln!(out, "<div class=\"meta\">Generated at {}</div>", timestamp(&Utc::now()))?;

        if summary.is_empty() {
            writeln!(out, "<p class=\"empty\">No inventory data available.</p>")?;
        }
        for reading in summary.ordered() {
            Self::device_section(out, reading, catalog)?;
        }
        if let Some(record) = &summary.consolidated {
            Self::consolidated_section(out, record, catalog)?;
        }
        writeln!(out, "</body></html>")
    }
}

impl ReportRenderer for HtmlRenderer {
    fn render(&self, summary: &Summary, catalog: &Catalog) -> Result<Artifact> {
        let mut out = String::new();
        self.write_into(&mut out, summary, catalog)
            .map_err(|e| InventoryError::Render(e.to_string()))?;

        Ok(Artifact {
            bytes:        out.into_bytes(),
            content_type: "text/html; charset=utf-8",
            extension:    "html",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::escape;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
        assert_eq!(escape("Jabón"), "Jabón");
    }
}
