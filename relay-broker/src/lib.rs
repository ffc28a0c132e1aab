//! Completion broker for the relay gateway.
//!
//! Lets a request handler start a slow, non-cancellable operation, wait a
//! short budget for it, and hand the client a correlation id to poll with
//! when the operation takes longer.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod broker;
pub mod config;
pub mod error;

pub use broker::{CompletionBroker, StartResult};
pub use config::{BrokerConfig, DEFAULT_WAIT_BUDGET};
pub use error::BrokerError;
