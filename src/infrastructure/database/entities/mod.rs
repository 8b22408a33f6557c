//! SeaORM entities, one module per table

pub mod connector;
pub mod meter_sample;
pub mod station;
pub mod transaction;
pub mod user;
