//! In-memory state store that publishes a `StateChanged` event per write.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use duolight_domain::entity::{EntityId, StateSnapshot};
use duolight_domain::error::HubError;
use duolight_domain::event::Event;

use crate::ports::{EventPublisher, StateStore};

/// [`StateStore`] keeping snapshots in a mutex-guarded map.
///
/// The lock is only held for map access, never across an `.await`.
pub struct InMemoryStateStore<P> {
    states: Mutex<HashMap<EntityId, StateSnapshot>>,
    publisher: P,
}

impl<P> InMemoryStateStore<P> {
    /// Create an empty store publishing through `publisher`.
    pub fn new(publisher: P) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            publisher,
        }
    }

    /// Ids of every entity currently in the store, sorted.
    #[must_use]
    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EntityId, StateSnapshot>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P: EventPublisher> StateStore for InMemoryStateStore<P> {
    fn get(&self, entity_id: &EntityId) -> Option<StateSnapshot> {
        self.lock().get(entity_id).cloned()
    }

    async fn set(&self, mut snapshot: StateSnapshot) -> Result<StateSnapshot, HubError> {
        let old = {
            let mut states = self.lock();
            let old = states.get(&snapshot.entity_id).cloned();
            if let Some(previous) = &old {
                if previous.state == snapshot.state {
                    snapshot.last_changed = previous.last_changed;
                }
            }
            states.insert(snapshot.entity_id.clone(), snapshot.clone());
            old
        };

        tracing::trace!(entity_id = %snapshot.entity_id, state = %snapshot.state, "state written");
        self.publisher
            .publish(Event::state_changed(
                snapshot.entity_id.clone(),
                old.as_ref(),
                Some(&snapshot),
            ))
            .await?;
        Ok(snapshot)
    }

    async fn remove(&self, entity_id: &EntityId) -> Result<Option<StateSnapshot>, HubError> {
        let old = self.lock().remove(entity_id);
        if old.is_some() {
            tracing::trace!(%entity_id, "state removed");
            self.publisher
                .publish(Event::state_changed(entity_id.clone(), old.as_ref(), None))
                .await?;
        }
        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duolight_domain::entity::EntityState;
    use duolight_domain::event::EventType;
    use std::future::Future;

    #[derive(Default)]
    struct SpyPublisher {
        events: Mutex<Vec<Event>>,
    }

    impl EventPublisher for SpyPublisher {
        fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
            self.events.lock().unwrap().push(event);
            async { Ok(()) }
        }
    }

    fn relay() -> EntityId {
        EntityId::parse("switch.relay").unwrap()
    }

    fn snapshot(state: EntityState) -> StateSnapshot {
        StateSnapshot::builder(relay()).state(state).build()
    }

    #[tokio::test]
    async fn should_return_none_for_missing_entity() {
        let store = InMemoryStateStore::new(SpyPublisher::default());
        assert!(store.get(&relay()).is_none());
    }

    #[tokio::test]
    async fn should_return_written_snapshot() {
        let store = InMemoryStateStore::new(SpyPublisher::default());
        store.set(snapshot(EntityState::On)).await.unwrap();

        let stored = store.get(&relay()).unwrap();
        assert_eq!(stored.state, EntityState::On);
        assert_eq!(store.entity_ids(), vec![relay()]);
    }

    #[tokio::test]
    async fn should_publish_old_and_new_state_on_write() {
        let store = InMemoryStateStore::new(SpyPublisher::default());
        store.set(snapshot(EntityState::Off)).await.unwrap();
        store.set(snapshot(EntityState::On)).await.unwrap();

        let events = store.publisher.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        let last = &events[1];
        assert_eq!(last.event_type, EventType::StateChanged);
        assert_eq!(last.data["old_state"]["state"], "off");
        assert_eq!(last.data["new_state"]["state"], "on");
    }

    #[tokio::test]
    async fn should_keep_last_changed_when_only_attributes_change() {
        let store = InMemoryStateStore::new(SpyPublisher::default());
        let first = store.set(snapshot(EntityState::On)).await.unwrap();

        let update = StateSnapshot::builder(relay())
            .state(EntityState::On)
            .attribute("brightness", 10)
            .timestamp(first.last_updated + chrono::TimeDelta::seconds(5))
            .build();
        let second = store.set(update).await.unwrap();

        assert_eq!(second.last_changed, first.last_changed);
        assert!(second.last_updated > first.last_updated);
    }

    #[tokio::test]
    async fn should_publish_removal_with_no_new_state() {
        let store = InMemoryStateStore::new(SpyPublisher::default());
        store.set(snapshot(EntityState::On)).await.unwrap();

        let removed = store.remove(&relay()).await.unwrap();
        assert!(removed.is_some());
        assert!(store.get(&relay()).is_none());

        let events = store.publisher.events.lock().unwrap();
        assert!(events[1].data["new_state"].is_null());
    }

    #[tokio::test]
    async fn should_not_publish_when_removing_missing_entity() {
        let store = InMemoryStateStore::new(SpyPublisher::default());
        assert!(store.remove(&relay()).await.unwrap().is_none());
        assert!(store.publisher.events.lock().unwrap().is_empty());
    }
}
