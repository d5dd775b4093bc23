//! In-process event bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use duolight_domain::error::HubError;
use duolight_domain::event::Event;

use crate::ports::{EventPublisher, EventSubscriber};

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSubscriber for InProcessEventBus {
    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
        // send only fails without receivers
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duolight_domain::entity::EntityId;
    use duolight_domain::event::EventType;

    #[tokio::test]
    async fn should_deliver_event_to_every_subscriber() {
        let bus = InProcessEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let event = Event::state_changed(EntityId::parse("switch.relay").unwrap(), None, None);
        let event_id = event.id;
        bus.publish(event).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap().id, event_id);
        assert_eq!(rx2.recv().await.unwrap().id, event_id);
    }

    #[tokio::test]
    async fn should_succeed_when_no_subscribers() {
        let bus = InProcessEventBus::new(16);
        assert!(bus.publish(Event::hub_started()).await.is_ok());
    }

    #[tokio::test]
    async fn should_not_deliver_events_published_before_subscription() {
        let bus = InProcessEventBus::new(16);
        bus.publish(Event::hub_stopping()).await.unwrap();

        let mut rx = bus.subscribe();
        bus.publish(Event::hub_started()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, EventType::HubStarted);
    }

    #[test]
    fn should_release_subscription_when_receiver_dropped() {
        let bus = InProcessEventBus::new(16);
        let rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(rx);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
