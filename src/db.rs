//! Database backend: drivers, the inventory entity and its migration.
pub mod driver;
pub mod entity;
pub mod migrations;

pub mod prelude {
    pub use super::entity::*;
}
