//! The explicit, lazily-initialized process-wide default bus.
//!
//! Kept as an ordinary `OnceLock` rather than hidden module-level state: a
//! caller who never touches `default_bus()` pays nothing and never observes
//! it, matching the design note in `DESIGN.md` that rejects implicit
//! import-time global construction.

use std::sync::OnceLock;

use crate::bus::{Bus, BusBuilder};

static DEFAULT_BUS: OnceLock<Bus> = OnceLock::new();

/// The process-wide default bus, built with default configuration on first
/// access.
pub fn default_bus() -> &'static Bus {
    DEFAULT_BUS.get_or_init(|| BusBuilder::new().build())
}

/// Closes the default bus if it was ever initialized. A no-op otherwise.
pub async fn shutdown_default_bus() {
    if let Some(bus) = DEFAULT_BUS.get() {
        bus.close().await;
    }
}
