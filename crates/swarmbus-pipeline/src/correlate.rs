//! Phase C — correlation injection.
//!
//! The only point in the pipeline where `message-id` may be overwritten:
//! every non-null override is set as a root attribute, clobbering whatever
//! Phase B healed in.

use crate::tree::Element;

#[derive(Debug, Clone, Default)]
pub struct CorrelationOverrides {
    pub message_id: Option<String>,
    pub in_reply_to: Option<String>,
    pub timestamp: Option<String>,
    pub tombstone: Option<bool>,
    pub outcome: Option<String>,
    pub task_id: Option<String>,
    pub version: Option<String>,
}

impl CorrelationOverrides {
    /// The common case: stamp a reply with the request it answers.
    pub fn reply_to(in_reply_to: impl Into<String>) -> Self {
        CorrelationOverrides { in_reply_to: Some(in_reply_to.into()), ..Default::default() }
    }

    fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = &self.message_id {
            out.push(("message-id", v.clone()));
        }
        if let Some(v) = &self.in_reply_to {
            out.push(("in-reply-to", v.clone()));
        }
        if let Some(v) = &self.timestamp {
            out.push(("timestamp", v.clone()));
        }
        if let Some(v) = &self.tombstone {
            out.push(("tombstone", v.to_string()));
        }
        if let Some(v) = &self.outcome {
            out.push(("outcome", v.clone()));
        }
        if let Some(v) = &self.task_id {
            out.push(("task-id", v.clone()));
        }
        if let Some(v) = &self.version {
            out.push(("version", v.clone()));
        }
        out
    }
}

pub fn apply(root: &mut Element, overrides: Option<&CorrelationOverrides>) {
    let Some(overrides) = overrides else { return };
    for (key, value) in overrides.entries() {
        root.set_attr(key, value);
    }
}
