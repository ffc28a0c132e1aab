//! Core types for the relay tunnel gateway.
//!
//! Defines the identifiers and values shared between the completion broker
//! and the HTTP gateway: correlation ids, operation outcomes and tunnel
//! records.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod id;
pub mod outcome;
pub mod tunnel;

pub use error::CoreError;
pub use id::{CorrelationId, TunnelId, CORRELATION_ID_LEN};
pub use outcome::Outcome;
pub use tunnel::{Tunnel, TunnelRequest};
