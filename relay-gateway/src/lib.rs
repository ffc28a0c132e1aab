//! HTTP gateway for the relay tunnel service.
//!
//! Exposes tunnel create/delete endpoints whose slow provisioning work is
//! bridged through a [`relay_broker::CompletionBroker`], plus the `/loading`
//! poll endpoint clients are sent to when that work outlives the wait budget.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod config;
pub mod error;
pub mod pool;
pub mod routes;
