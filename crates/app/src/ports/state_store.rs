//! State store port — the runtime's current snapshot of every entity.

use std::future::Future;

use duolight_domain::entity::{EntityId, StateSnapshot};
use duolight_domain::error::HubError;

/// Holds the latest [`StateSnapshot`] per entity.
///
/// Reads are synchronous and always reflect the latest write. Writes and
/// removals publish a `StateChanged` event.
pub trait StateStore: Send + Sync {
    /// Current snapshot, or `None` when the entity is not in the store.
    fn get(&self, entity_id: &EntityId) -> Option<StateSnapshot>;

    /// Insert or replace the snapshot of `snapshot.entity_id`.
    ///
    /// Returns the snapshot as stored.
    fn set(
        &self,
        snapshot: StateSnapshot,
    ) -> impl Future<Output = Result<StateSnapshot, HubError>> + Send;

    /// Drop the snapshot of `entity_id`, returning it if present.
    fn remove(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<StateSnapshot>, HubError>> + Send;
}

impl<T: StateStore> StateStore for std::sync::Arc<T> {
    fn get(&self, entity_id: &EntityId) -> Option<StateSnapshot> {
        (**self).get(entity_id)
    }

    fn set(
        &self,
        snapshot: StateSnapshot,
    ) -> impl Future<Output = Result<StateSnapshot, HubError>> + Send {
        (**self).set(snapshot)
    }

    fn remove(
        &self,
        entity_id: &EntityId,
    ) -> impl Future<Output = Result<Option<StateSnapshot>, HubError>> + Send {
        (**self).remove(entity_id)
    }
}
