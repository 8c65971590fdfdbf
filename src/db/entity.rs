pub mod cleaning_inventory;

pub use cleaning_inventory::ActiveModel as CleaningInventoryActive;
pub use cleaning_inventory::Column as CleaningInventoryColumn;
pub use cleaning_inventory::Entity as CleaningInventories;
pub use cleaning_inventory::Model as CleaningInventory;
