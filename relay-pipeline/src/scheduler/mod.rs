//! Scheduler layer for the pipeline
//!
//! Runs webhook deliveries concurrently under a bounded number of slots and
//! collects their outcomes once the run has finished iterating.

pub mod dispatcher;

pub use dispatcher::{DeliveryDispatcher, DeliveryReport, DispatchConfig, INTERRUPTED_ERROR};
