use sea_orm::entity::prelude::*;
use serde::Deserialize;
use serde::Serialize;

/// One stock reading for a device. Rows are only ever inserted; the history of a device is the sequence of its rows.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cleaning_inventories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id:          i32,
    #[sea_orm(indexed)]
    pub device:      String,
    /// JSON array of `{"productId": ..., "quantity": ...}` objects. Kept as raw JSON since rows written by older
    /// clients don't always follow the shape.
    pub products:    Json,
    pub reported_by: String,
    /// Calendar date of the reading as entered, `YYYY-MM-DD`.
    pub date:        String,
    pub created_at:  DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
