//! Marketplace domain model
pub mod aggregates;
pub mod events;
pub mod identity;
pub mod value_objects;
