//! Port definitions — traits the host runtime implements.
//!
//! The dual entity light only ever talks to the runtime through these
//! traits, so the same adapter runs against the in-process implementations
//! in this crate, a test double, or a real hub.

pub mod event_bus;
pub mod service_caller;
pub mod state_store;

pub use event_bus::{EventPublisher, EventSubscriber};
pub use service_caller::ServiceCaller;
pub use state_store::StateStore;
