//! Foundation utilities shared by every swarmbus crate: structured logging
//! setup, ISO-8601 timestamp helpers, the canonical namespace table, and the
//! base error type the rest of the workspace builds on.

pub mod error;
pub mod logging;
pub mod namespace;
pub mod timestamps;

pub use error::BusError;
