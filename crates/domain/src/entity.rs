//! Entity — an observable/controllable thing known to the host runtime.
//!
//! The runtime's state store holds one [`StateSnapshot`] per [`EntityId`].
//! Snapshots are immutable values; a change produces a new snapshot.

mod entity_id;
mod snapshot;
mod state;

pub use entity_id::EntityId;
pub use snapshot::{StateSnapshot, StateSnapshotBuilder};
pub use state::EntityState;
