//! Logging setup for applications embedding the chain adapters.
//!
//! Adapters only emit `tracing` events; this crate installs the subscriber
//! that renders them.

pub mod tracing;

pub use crate::tracing::{init_tracing, TracingConfig, TracingError};
