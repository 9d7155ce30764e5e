use thiserror::Error;

/// Taxonomy of errors the bus surfaces to its callers.
///
/// Only four kinds ever reach a publisher directly (`PipelineUnrepairable`,
/// `Timeout`, `NoListener`, `CorrelationMissing`); everything else — schema
/// load failures, handler panics, circuit-open skips — is absorbed
/// internally and never constructed as this type.
#[derive(Error, Debug)]
pub enum BusError {
    #[error("message could not be repaired: {reason}")]
    PipelineUnrepairable { reason: String },

    #[error("request timed out waiting for a reply")]
    Timeout,

    #[error("no listener registered for root `{root}` version `{version}`")]
    NoListener { root: String, version: String },

    #[error("reply has no resolvable in-reply-to target")]
    CorrelationMissing,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
