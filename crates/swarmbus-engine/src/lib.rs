//! The routing & correlation engine and bus facade: the component that
//! turns a normalized [`swarmbus_pipeline::ProcessedMessage`] into listener
//! dispatch, cardinality-aware completion, and circuit-breaker-gated
//! failure isolation.
//!
//! [`Bus`] is the type applications construct and hold onto; everything
//! else in this crate is either its configuration ([`BusBuilder`]) or the
//! vocabulary its methods speak ([`Cardinality`], [`RequestOptions`],
//! [`RequestReply`], [`Reply`]).

mod bus;
mod pending;
mod reply;
mod singleton;

pub use bus::{Bus, BusBuilder, PublishedMessage, RequestOptions, RequestReply};
pub use pending::Cardinality;
pub use reply::{Outcome, Reply};
pub use singleton::{default_bus, shutdown_default_bus};

pub use swarmbus_registry::VersionMatch;
