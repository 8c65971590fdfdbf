//! Fixed lists the application works with: devices, trackable products and the quantity choices offered for them.
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::types::Result;

/// The catch-all "other products" entry. It holds free-form text, never a quantity.
pub const FREE_TEXT_PRODUCT_ID: &str = "otros";
pub const KITCHEN_PAPER_PRODUCT_ID: &str = "papel_cocina";

pub const DEFAULT_GROUP_LABEL: &str = "LAC";
pub const DEFAULT_GROUP_MEMBERS: &[&str] = &["LAC1", "LAC2", "LAC3", "LAC4", "LAC5", "LAC6"];

pub const DEVICES: &[&str] = &[
    "MM", "MF", "LAC1", "LAC2", "LAC3", "LAC4", "LAC5", "LAC6", "CAI", "Oficina",
];

const DEFAULT_PRODUCTS: &[(&str, &str)] = &[
    ("lejia", "Lejía"),
    ("fregasuelos", "Fregasuelos"),
    ("lavavajillas", "Lavavajillas"),
    ("detergente", "Detergente ropa"),
    ("suavizante", "Suavizante"),
    ("limpiacristales", "Limpiacristales"),
    ("desengrasante", "Desengrasante"),
    ("jabon_manos", "Jabón de manos"),
    ("papel_higienico", "Papel higiénico"),
    (KITCHEN_PAPER_PRODUCT_ID, "Papel de cocina"),
    ("bolsas_basura", "Bolsas de basura"),
    ("estropajos", "Estropajos"),
    ("bayetas", "Bayetas"),
    ("guantes", "Guantes"),
    (FREE_TEXT_PRODUCT_ID, "Otros"),
];

const FALLBACK_QUANTITIES: &[&str] = &["0", "1", "2", "3", "4", "5"];
const MM_MF_FALLBACK_QUANTITIES: &[&str] = &["0", "1"];
const GROUP_DEFAULT_QUANTITIES: &[&str] = &["0", "1", "2", "3"];
const GROUP_KITCHEN_PAPER_QUANTITIES: &[&str] = &["0", "1", "2", "3", "4", "5", "6", "7", "8"];

const MM_MF_QUANTITIES: &[(&str, &[&str])] = &[
    ("lejia", &["0", "1", "2"]),
    ("fregasuelos", &["0", "1", "2"]),
    ("papel_higienico", &["0", "6", "12", "18", "24"]),
    (KITCHEN_PAPER_PRODUCT_ID, &["0", "2", "4", "6"]),
    ("bolsas_basura", &["0", "1", "2", "3"]),
];

const PRODUCT_SPECIFIC_QUANTITIES: &[(&str, &[&str])] = &[
    ("papel_higienico", &["0", "6", "12", "18", "24", "30", "36"]),
    (KITCHEN_PAPER_PRODUCT_ID, &["0", "2", "4", "6", "8", "10", "12"]),
    ("bolsas_basura", &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]),
    ("guantes", &["0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogItem {
    pub id:   String,
    pub name: String,
}

/// Product id to display name mapping, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    #[serde(default = "Catalog::default_free_text_id")]
    free_text_id: String,
    products:     Vec<CatalogItem>,
}

impl Catalog {
    pub fn new<I, S1, S2>(items: I) -> Self
    where
        I: IntoIterator<Item = (S1, S2)>,
        S1: ToString,
        S2: ToString,
    {
        Self {
            free_text_id: Self::default_free_text_id(),
            products:     items
                .into_iter()
                .map(|(id, name)| CatalogItem {
                    id:   id.to_string(),
                    name: name.to_string(),
                })
                .collect(),
        }
    }

    /// Load a catalog from a JSON file of the form `{"products": [{"id": ..., "name": ...}]}`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn default_free_text_id() -> String {
        FREE_TEXT_PRODUCT_ID.to_string()
    }

    pub fn with_free_text_id<S: ToString>(mut self, id: S) -> Self {
        self.free_text_id = id.to_string();
        self
    }

    pub fn free_text_id(&self) -> &str {
        &self.free_text_id
    }

    pub fn is_free_text(&self, product_id: &str) -> bool {
        self.free_text_id == product_id
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.products
    }

    pub fn name_of(&self, product_id: &str) -> Option<&str> {
        self.products
            .iter()
            .find(|p| p.id == product_id)
            .map(|p| p.name.as_str())
    }

    /// Display name for a product, falling back to the id itself for products the catalog doesn't know about.
    pub fn display_name<'a>(&'a self, product_id: &'a str) -> &'a str {
        self.name_of(product_id).unwrap_or(product_id)
    }

    /// Ids of all products that carry a numeric quantity.
    pub fn numeric_ids(&self) -> impl Iterator<Item = &str> {
        self.products
            .iter()
            .filter(|p| p.id != self.free_text_id)
            .map(|p| p.id.as_str())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_PRODUCTS.iter().copied())
    }
}

fn lookup<'a>(table: &'a [(&str, &'a [&'a str])], product_id: &str) -> Option<&'a [&'a str]> {
    table.iter().find(|(id, _)| *id == product_id).map(|(_, q)| *q)
}

/// Quantity choices offered in the entry form for a product on a device. Members of the summable group get their own
/// short lists; the consolidated view is read-only and therefore has no choices at all.
pub fn quantity_options(product_id: &str, device: &str, group_label: &str, group_members: &[String]) -> Vec<String> {
    let options: &[&str] = if device == "MM" || device == "MF" {
        lookup(MM_MF_QUANTITIES, product_id).unwrap_or(MM_MF_FALLBACK_QUANTITIES)
    }
    else if device == group_label {
        &[]
    }
    else if group_members.iter().any(|m| m == device) {
        if product_id == KITCHEN_PAPER_PRODUCT_ID {
            GROUP_KITCHEN_PAPER_QUANTITIES
        }
        else {
            GROUP_DEFAULT_QUANTITIES
        }
    }
    else {
        lookup(PRODUCT_SPECIFIC_QUANTITIES, product_id).unwrap_or(FALLBACK_QUANTITIES)
    };

    options.iter().map(|q| q.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<String> {
        DEFAULT_GROUP_MEMBERS.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let catalog = Catalog::default();
        assert_eq!(catalog.display_name("lejia"), "Lejía");
        assert_eq!(catalog.display_name("unknown_thing"), "unknown_thing");
    }

    #[test]
    fn numeric_ids_skip_free_text() {
        let catalog = Catalog::default();
        assert!(catalog.numeric_ids().all(|id| id != FREE_TEXT_PRODUCT_ID));
        assert_eq!(catalog.numeric_ids().count(), catalog.items().len() - 1);
    }

    #[test]
    fn quantity_options_per_device_kind() {
        let members = members();
        assert_eq!(quantity_options("lejia", "MM", "LAC", &members), vec!["0", "1", "2"]);
        assert_eq!(quantity_options("guantes", "MF", "LAC", &members), vec!["0", "1"]);
        assert_eq!(quantity_options("lejia", "LAC2", "LAC", &members), vec!["0", "1", "2", "3"]);
        assert_eq!(
            quantity_options(KITCHEN_PAPER_PRODUCT_ID, "LAC4", "LAC", &members).len(),
            GROUP_KITCHEN_PAPER_QUANTITIES.len()
        );
        assert!(quantity_options("lejia", "LAC", "LAC", &members).is_empty());
        assert_eq!(quantity_options("lejia", "CAI", "LAC", &members).len(), 6);
        assert_eq!(quantity_options("guantes", "CAI", "LAC", &members).len(), 11);
    }

    #[test]
    fn catalog_loads_from_json() {
        let catalog: Catalog =
            serde_json::from_str(r#"{"products": [{"id": "paper", "name": "Paper"}, {"id": "otros", "name": "Other"}]}"#)
                .unwrap();
        assert_eq!(catalog.free_text_id(), FREE_TEXT_PRODUCT_ID);
        assert_eq!(catalog.numeric_ids().collect::<Vec<_>>(), vec!["paper"]);
    }
}
