pub mod inventory;
pub mod metadata;
pub mod point;
