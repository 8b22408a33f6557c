//! Infrastructure layer - persistence implementations

pub mod database;
pub mod memory;

pub use database::{init_database, DatabaseConfig};
pub use database::repositories::SeaOrmRepositoryProvider;
pub use memory::InMemoryRepositoryProvider;
