//! `swarmbus`: an in-process XML-framed message bus for cooperating agents.
//!
//! This crate is a thin facade over its workspace: [`Bus`] is the type
//! applications construct and hold onto, [`Cardinality`]/[`RequestOptions`]/
//! [`Reply`]/[`Outcome`] are the vocabulary its methods speak, and
//! [`default_bus`] is the process-wide singleton for callers who don't need
//! more than one bus.
//!
//! # Example
//!
//! ```rust,no_run
//! use swarmbus::{Bus, Cardinality};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let bus = Bus::builder().build();
//! bus.register_listener(&["cad-task"], swarmbus::VersionMatch::Wildcard, 0, |xml| async move {
//!     Ok(Some(xml))
//! });
//! let _reply = bus.request(b"<cad-task/>", Default::default()).await?;
//! bus.close().await;
//! # Ok(())
//! # }
//! ```

pub use swarmbus_engine::{
    Bus, BusBuilder, Cardinality, Outcome, PublishedMessage, RequestOptions, RequestReply, Reply,
    VersionMatch, default_bus, shutdown_default_bus,
};

pub use swarmbus_config::BusConfig;
pub use swarmbus_pipeline::{CorrelationOverrides, ProcessedMessage};
pub use swarmbus_schema::{Schema, SchemaCatalog};
pub use swarmbus_utils::BusError;

pub mod cli {
    pub use swarmbus_cli::*;
}
