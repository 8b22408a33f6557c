//! SeaORM repository implementations

pub mod station_repository;
pub mod transaction_repository;
pub mod user_repository;

use sea_orm::DatabaseConnection;

use crate::domain::{RepositoryProvider, StationRepository, TransactionRepository, UserRepository};

pub use station_repository::SeaOrmStationRepository;
pub use transaction_repository::SeaOrmTransactionRepository;
pub use user_repository::SeaOrmUserRepository;

/// Bundles the SeaORM repositories over one shared connection pool.
pub struct SeaOrmRepositoryProvider {
    stations: SeaOrmStationRepository,
    transactions: SeaOrmTransactionRepository,
    users: SeaOrmUserRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            stations: SeaOrmStationRepository::new(db.clone()),
            transactions: SeaOrmTransactionRepository::new(db.clone()),
            users: SeaOrmUserRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn stations(&self) -> &dyn StationRepository {
        &self.stations
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        &self.transactions
    }

    fn users(&self) -> &dyn UserRepository {
        &self.users
    }
}

pub(crate) fn db_err(e: sea_orm::DbErr) -> crate::domain::DomainError {
    crate::domain::DomainError::Storage(e.to_string())
}
