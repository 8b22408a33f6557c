//! Vendor-extensible DataTransfer handling
//!
//! DataTransfer is the protocol's escape hatch: a vendor id plus an
//! opaque blob. Vendors register a handler here; anything without one
//! gets `UnknownVendorId`.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a vendor handler, mapped onto the protocol's
/// DataTransfer status values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataTransferOutcome {
    Accepted { data: Option<String> },
    Rejected,
    UnknownMessageId,
    UnknownVendorId,
}

/// A registered vendor extension.
#[async_trait]
pub trait VendorDataHandler: Send + Sync {
    async fn handle(
        &self,
        station_id: &str,
        message_id: Option<&str>,
        data: Option<&str>,
    ) -> DataTransferOutcome;
}

/// Registry of vendor handlers keyed by vendor id.
pub struct DataTransferRegistry {
    handlers: DashMap<String, Arc<dyn VendorDataHandler>>,
}

impl DataTransferRegistry {
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }

    pub fn register(&self, vendor_id: impl Into<String>, handler: Arc<dyn VendorDataHandler>) {
        self.handlers.insert(vendor_id.into(), handler);
    }

    /// Dispatch to the vendor handler; `UnknownVendorId` by default.
    pub async fn dispatch(
        &self,
        station_id: &str,
        vendor_id: &str,
        message_id: Option<&str>,
        data: Option<&str>,
    ) -> DataTransferOutcome {
        let handler = self.handlers.get(vendor_id).map(|e| e.value().clone());
        match handler {
            Some(handler) => handler.handle(station_id, message_id, data).await,
            None => {
                debug!(station_id, vendor_id, "DataTransfer for unregistered vendor");
                DataTransferOutcome::UnknownVendorId
            }
        }
    }
}

impl Default for DataTransferRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl VendorDataHandler for Echo {
        async fn handle(
            &self,
            _station_id: &str,
            _message_id: Option<&str>,
            data: Option<&str>,
        ) -> DataTransferOutcome {
            DataTransferOutcome::Accepted {
                data: data.map(String::from),
            }
        }
    }

    #[tokio::test]
    async fn unregistered_vendor_is_unknown() {
        let registry = DataTransferRegistry::new();
        let outcome = registry.dispatch("CP-001", "acme", None, None).await;
        assert_eq!(outcome, DataTransferOutcome::UnknownVendorId);
    }

    #[tokio::test]
    async fn registered_vendor_handles() {
        let registry = DataTransferRegistry::new();
        registry.register("acme", Arc::new(Echo));
        let outcome = registry
            .dispatch("CP-001", "acme", Some("m1"), Some("ping"))
            .await;
        assert_eq!(
            outcome,
            DataTransferOutcome::Accepted {
                data: Some("ping".into())
            }
        );
    }
}
