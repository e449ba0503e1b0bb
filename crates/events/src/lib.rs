//! Progress events for pipeline runs
//!
//! This crate provides the event bus and event types consumed by progress
//! displays. Publishing never blocks and never fails the run.

mod bus;
mod types;

pub use bus::EventBus;
pub use types::*;
