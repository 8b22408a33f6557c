//! Event bus for broadcasting events to subscribers

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::types::Event;

const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast bus delivering every published [`Event`] to all live
/// subscribers. Slow subscribers lag and drop, they never block the
/// publisher.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn publish(&self, event: Event) {
        let event_type = event.event_type();
        metrics::counter!("csms_events_total", "type" => event_type).increment(1);

        match event_type {
            "transaction_started" => {
                metrics::counter!("csms_transactions_total", "status" => "started").increment(1);
            }
            "transaction_stopped" => {
                metrics::counter!("csms_transactions_total", "status" => "stopped").increment(1);
            }
            _ => {}
        }

        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_type, subscribers = count, "Event published");
            }
            Err(_) => {
                debug!(event_type, "Event published (no subscribers)");
            }
        }
    }

    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        self.subscriber_count.fetch_add(1, Ordering::SeqCst);
        let count = self.subscriber_count.load(Ordering::SeqCst);
        info!(total = count, "New event subscriber");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event subscriber that receives events from the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<Event>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Receive the next event; `None` when the bus is gone or this
    /// subscriber lagged past the channel capacity.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event subscriber lagged, skipping");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Create a shared event bus.
pub fn create_event_bus() -> EventBus {
    EventBus::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::HeartbeatReceivedEvent;
    use chrono::Utc;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();

        bus.publish(Event::HeartbeatReceived(HeartbeatReceivedEvent {
            station_id: "CP-001".into(),
            timestamp: Utc::now(),
        }));

        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type(), "heartbeat_received");
        assert_eq!(event.station_id(), "CP-001");
    }

    #[tokio::test]
    async fn subscriber_count_tracks_drops() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);
        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
