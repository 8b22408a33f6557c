//! OCPP 2.0.1 inbound handlers

mod authorize;
mod boot_notification;
mod data_transfer;
mod heartbeat;
mod meter_values;
mod status_notification;
mod transaction_event;

use serde_json::Value;

use crate::events::EventBus;
use crate::ocpp::CallFault;
use crate::services::Services;

/// Per-call handler context for a 2.0.1 session.
pub struct V201Handler<'a> {
    pub station_id: &'a str,
    pub services: &'a Services,
    pub events: &'a EventBus,
}

impl<'a> V201Handler<'a> {
    pub fn new(station_id: &'a str, services: &'a Services, events: &'a EventBus) -> Self {
        Self {
            station_id,
            services,
            events,
        }
    }

    /// Invoke the handler for an already-validated action.
    pub async fn dispatch(&self, action: &str, payload: &Value) -> Result<Value, CallFault> {
        match action {
            "BootNotification" => boot_notification::handle(self, payload).await,
            "Heartbeat" => heartbeat::handle(self, payload).await,
            "StatusNotification" => status_notification::handle(self, payload).await,
            "Authorize" => authorize::handle(self, payload).await,
            "TransactionEvent" => transaction_event::handle(self, payload).await,
            "MeterValues" => meter_values::handle(self, payload).await,
            "DataTransfer" => data_transfer::handle(self, payload).await,
            other => Err(CallFault::not_implemented(other)),
        }
    }
}
