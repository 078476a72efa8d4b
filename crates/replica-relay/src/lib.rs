//! replica-relay - binary relay and agent layer for replica canister calls
//!
//! Two pieces live here:
//! - [`proxy`]: a stateless forwarder that relays opaque CBOR payloads from a
//!   browser to one trusted replica endpoint, enforcing destination and CORS
//!   policy.
//! - [`agent`]: a [`agent::ConnectionRegistry`] that hands out a shared
//!   anonymous client or identity-bound clients, binds typed actors to
//!   canisters, and bounds every call with a timeout.

pub mod agent;
pub mod config;
pub mod error;
pub mod proxy;

pub use error::{RelayError, Result};
