//! Data Transfer Objects
//!
//! Shapes that cross a process boundary: the request accepted by the relay
//! service and the payload posted to webhooks. They are decoupled from the
//! domain types so the wire format stays stable when the domain evolves.

pub mod process;
pub mod webhook;
