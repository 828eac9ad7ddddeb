//! Core domain types
//!
//! Orders as fetched from upstream, the transition computed for each of them,
//! and the aggregate result of one pipeline run.

pub mod lenient;
pub mod order;
pub mod run;
pub mod transition;
