//! # duolight-app
//!
//! Application layer — the dual entity light and the **port definitions**
//! (traits) it needs from the host runtime.
//!
//! ## Responsibilities
//! - Define **port traits** the runtime implements (driven/outbound ports):
//!   - `StateStore` — read and write entity state snapshots
//!   - `ServiceCaller` — dispatch service calls to entities
//!   - `EventPublisher` / `EventSubscriber` — the event bus
//! - Provide **in-process infrastructure** (event bus, state store) that
//!   doesn't need IO
//! - Implement the composite light (`light`), its registration shim
//!   (`platform`) and the service dispatcher (`router`)
//!
//! ## Dependency rule
//! Depends on `duolight-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod event_bus;
pub mod light;
pub mod platform;
pub mod ports;
pub mod router;
pub mod state_store;
