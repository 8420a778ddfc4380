//! services/capture_api/src/adapters/event_bus.rs
//!
//! A broadcast channel that implements the core's `EventSink` port, so that every
//! connected client (SSE, WebSocket) and the snapshot writer see the same events.

use course_capture_core::domain::CaptureEvent;
use course_capture_core::ports::EventSink;
use tokio::sync::broadcast;

/// Fan-out of capture events to any number of subscribers.
///
/// Publishing never blocks the engine: a slow subscriber lags and is told how many
/// events it missed, and publishing with no subscribers is a no-op.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CaptureEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: CaptureEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_capture_core::domain::{Course, EntitySnapshot};

    fn course_update() -> CaptureEvent {
        CaptureEvent::Updated(EntitySnapshot::Courses(vec![Course {
            id: "10".into(),
            ..Default::default()
        }]))
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(course_update());

        assert_eq!(first.recv().await.unwrap(), course_update());
        assert_eq!(second.recv().await.unwrap(), course_update());
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new(8);
        bus.publish(course_update());
        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.capacity(), 8);
    }
}
