//! The pending-request table: one entry per in-flight `request()` call,
//! keyed by `message-id`.
//!
//! An entry is removed exactly once, at the moment it fires — removal from
//! the map *is* the "has this request already completed" check, so
//! [`crate::bus::Bus`] never needs a separate completed flag.

use tokio::sync::oneshot;

/// How many listeners a message should be delivered to, and what a caller
/// awaiting a reply expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Deliver to the single highest-priority viable listener.
    One,
    /// Deliver to every viable listener; the caller gets the first reply.
    Any,
    /// Deliver to every viable listener; the caller waits for all of them.
    All,
}

/// What a completed request resolves to, sent once over the pending entry's
/// oneshot channel.
#[derive(Debug)]
pub(crate) enum PendingOutcome {
    One(Vec<u8>),
    All(Vec<Vec<u8>>),
    NoListener,
}

/// What `Bus::complete` ever receives as a new fact about a pending request.
/// Narrower than [`PendingOutcome`] on purpose: nothing ever hands `complete`
/// a pre-built `All` — that variant is only assembled internally, once
/// enough `Reply`s have arrived for a `Cardinality::All` request.
#[derive(Debug)]
pub(crate) enum CompletionInput {
    Reply(Vec<u8>),
    NoListener,
}

pub(crate) struct PendingEntry {
    pub sender: Option<oneshot::Sender<PendingOutcome>>,
    pub cardinality: Cardinality,
    pub required_replies: usize,
    pub replies: Vec<Vec<u8>>,
}

impl PendingEntry {
    pub fn new(sender: oneshot::Sender<PendingOutcome>, cardinality: Cardinality) -> Self {
        Self { sender: Some(sender), cardinality, required_replies: 1, replies: Vec::new() }
    }
}
