//! The structured reply a listener (or a caller of [`crate::Bus::reply`]) can
//! hand back instead of raw bytes, when it needs to carry correlation
//! metadata the pipeline would otherwise have to guess at.

/// A reply's terminal status, injected into the outgoing message's `outcome`
/// root attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
    Cancelled,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failed => "failed",
            Outcome::Cancelled => "cancelled",
        }
    }
}

/// A reply constructed with explicit correlation fields rather than relying
/// on the bus to infer them. Immutable once built; the `with_*` methods
/// consume and return `self`.
#[derive(Debug, Clone)]
pub struct Reply {
    pub xml: Vec<u8>,
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub tombstone: bool,
    pub outcome: Option<Outcome>,
}

impl Reply {
    pub fn new(xml: impl Into<Vec<u8>>) -> Self {
        Self { xml: xml.into(), message_id: None, in_reply_to: None, tombstone: false, outcome: None }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_in_reply_to(mut self, in_reply_to: impl Into<String>) -> Self {
        self.in_reply_to = Some(in_reply_to.into());
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn tombstoned(mut self) -> Self {
        self.tombstone = true;
        self
    }
}
