//! Domain layer - core business entities and types

pub mod error;
pub mod repositories;
pub mod station;
pub mod transaction;
pub mod user;
pub mod version;

pub use error::{DomainError, DomainResult};
pub use repositories::{
    RepositoryProvider, StationRepository, TransactionFilter, TransactionRepository,
    UserRepository,
};
pub use station::{Connector, ConnectorStatus, Station, StationStatus};
pub use transaction::{MeterSample, Transaction, TransactionStatus};
pub use user::{AuthStatus, User};
pub use version::OcppVersion;
