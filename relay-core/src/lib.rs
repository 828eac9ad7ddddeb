//! Relay Core
//!
//! Core types shared by every Relay crate.
//!
//! This crate contains:
//! - Domain types: orders as fetched from upstream, detected transitions and run results
//! - DTOs: the process request accepted by the service and the webhook wire shape
//! - Call context: request-scoped metadata and the run deadline

pub mod context;
pub mod domain;
pub mod dto;

pub use context::{CallContext, Deadline};
