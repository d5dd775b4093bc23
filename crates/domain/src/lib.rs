//! # duolight-domain
//!
//! Pure domain model for the duolight composite light integration.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **entity ids** (`<domain>.<object_id>`) and **state snapshots**
//! - Define the **light vocabulary** (color modes, feature flags, attribute keys)
//! - Define **services** (commands forwarded to other entities)
//! - Define **events** (state changes, hub lifecycle)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod entity;
pub mod event;
pub mod light;
pub mod service;
