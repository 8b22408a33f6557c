//! Domain services
//!
//! Business logic between the protocol handlers / REST surface and the
//! persistence port. All connector-mutating operations funnel through
//! [`ConnectorLockMap`] so that operations on the same connector are
//! serialized while different connectors proceed in parallel.

pub mod authorization;
pub mod connector_lock;
pub mod data_transfer;
pub mod liveness;
pub mod station;
pub mod transaction;

use std::sync::Arc;

use crate::domain::RepositoryProvider;
use crate::events::EventBus;

pub use authorization::AuthorizationService;
pub use connector_lock::ConnectorLockMap;
pub use data_transfer::{DataTransferOutcome, DataTransferRegistry, VendorDataHandler};
pub use liveness::{LivenessConfig, LivenessSupervisor};
pub use station::{BootOutcome, StationService};
pub use transaction::TransactionService;

/// The bundle of services handed to protocol handlers and the REST
/// surface.
#[derive(Clone)]
pub struct Services {
    pub stations: Arc<StationService>,
    pub transactions: Arc<TransactionService>,
    pub authorization: Arc<AuthorizationService>,
    pub data_transfer: Arc<DataTransferRegistry>,
}

impl Services {
    /// Wire up the service layer over a repository provider.
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        events: EventBus,
        heartbeat_interval: u32,
    ) -> Self {
        let locks = Arc::new(ConnectorLockMap::new());
        let stations = Arc::new(StationService::new(
            repos.clone(),
            locks.clone(),
            events.clone(),
            heartbeat_interval,
        ));
        let transactions = Arc::new(TransactionService::new(
            repos.clone(),
            locks,
            events.clone(),
        ));
        let authorization = Arc::new(AuthorizationService::new(repos));
        let data_transfer = Arc::new(DataTransferRegistry::new());

        Self {
            stations,
            transactions,
            authorization,
            data_transfer,
        }
    }
}
