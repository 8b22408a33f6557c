//! Lifecycle events and the broadcast bus

pub mod event_bus;
pub mod types;

pub use event_bus::{create_event_bus, EventBus, EventSubscriber};
pub use types::{
    BootReceivedEvent, ConnectorStatusChangedEvent, Event, HeartbeatReceivedEvent,
    MeterValuesEvent, StationConnectedEvent, StationDisconnectedEvent, TransactionStartedEvent,
    TransactionStoppedEvent,
};
