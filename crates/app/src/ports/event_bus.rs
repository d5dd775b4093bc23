//! Event bus ports — publish/subscribe for runtime events.

use std::future::Future;

use tokio::sync::broadcast;

use duolight_domain::error::HubError;
use duolight_domain::event::Event;

/// Publishes events to interested subscribers.
pub trait EventPublisher: Send + Sync {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send;
}

impl<T: EventPublisher> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).publish(event)
    }
}

/// Hands out receivers for every event published after the call.
///
/// Dropping the receiver is how a subscription is released.
pub trait EventSubscriber {
    fn subscribe(&self) -> broadcast::Receiver<Event>;
}

impl<T: EventSubscriber> EventSubscriber for std::sync::Arc<T> {
    fn subscribe(&self) -> broadcast::Receiver<Event> {
        (**self).subscribe()
    }
}
