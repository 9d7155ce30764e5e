//! The normalization pipeline: repair → heal → correlate → canonicalize.
//!
//! [`process`] is the pipeline's single entry point and a total function
//! over any byte sequence claiming to be XML, except for the one case where
//! even aggressive healing cannot produce a usable element
//! ([`BusError::PipelineUnrepairable`]).

mod canon;
mod correlate;
mod heal;
mod repair;
pub mod tree;
mod xmlio;

pub use correlate::CorrelationOverrides;
pub use tree::{Attr, Element, Node, QName};

use swarmbus_schema::SchemaCatalog;
use swarmbus_utils::BusError;

/// A message that has completed the full pipeline: canonical bytes plus the
/// metadata the routing engine needs without re-parsing them.
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    pub canonical_bytes: Vec<u8>,
    pub root_local_name: String,
    pub version: Option<String>,
    pub message_id: String,
}

/// Marks one of the pipeline's four ordered stages, purely for tracing —
/// each stage's actual work lives in its own module.
trait Phase {
    fn name(&self) -> &'static str;
}

struct RepairPhase;
impl Phase for RepairPhase {
    fn name(&self) -> &'static str {
        "repair"
    }
}
struct HealPhase;
impl Phase for HealPhase {
    fn name(&self) -> &'static str {
        "heal"
    }
}
struct CorrelatePhase;
impl Phase for CorrelatePhase {
    fn name(&self) -> &'static str {
        "correlate"
    }
}
struct CanonicalizePhase;
impl Phase for CanonicalizePhase {
    fn name(&self) -> &'static str {
        "canonicalize"
    }
}

/// Runs `raw` through all four phases, producing canonical bytes and the
/// metadata the bus needs to route the message.
pub fn process(
    raw: &[u8],
    overrides: Option<&CorrelationOverrides>,
    schemas: &SchemaCatalog,
) -> Result<ProcessedMessage, BusError> {
    let span = swarmbus_utils::logging::pipeline_span("pending");
    let _enter = span.enter();

    tracing::trace!(phase = RepairPhase.name());
    let mut root = repair::repair(raw)?;

    tracing::trace!(phase = HealPhase.name(), root = %root.name.local);
    root = heal::heal(root, schemas);

    tracing::trace!(phase = CorrelatePhase.name());
    correlate::apply(&mut root, overrides);

    let root_local_name = root.name.local.clone();
    let version = root.attr("version").map(str::to_string);
    let message_id = root
        .attr("message-id")
        .expect("heal::heal always ensures message-id is present")
        .to_string();

    tracing::trace!(phase = CanonicalizePhase.name());
    let canonical_bytes = canon::canonicalize(&root);

    Ok(ProcessedMessage { canonical_bytes, root_local_name, version, message_id })
}

/// Extracts `message-id` from bytes the caller already believes are
/// canonical, without a full pipeline pass. Used by the routing engine when
/// correlating a reply it did not itself just process.
pub fn extract_message_id(canonical: &[u8]) -> Option<String> {
    repair::repair(canonical).ok()?.attr("message-id").map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_truncated_input_repairs_and_gains_core_fields() {
        let result = process(b"<cad-task>broken</cad", None, &SchemaCatalog::empty()).unwrap();
        assert_eq!(result.root_local_name, "cad-task");
        let text = String::from_utf8(result.canonical_bytes).unwrap();
        assert!(text.contains("message-id="));
        assert!(text.contains("timestamp="));
    }

    #[test]
    fn idempotence_reprocessing_canonical_output_is_a_fixed_point() {
        let first = process(br#"<cad-task version="1.0">test</cad-task>"#, None, &SchemaCatalog::empty()).unwrap();
        let second = process(&first.canonical_bytes, None, &SchemaCatalog::empty()).unwrap();
        assert_eq!(first.canonical_bytes, second.canonical_bytes);
    }

    #[test]
    fn attribute_order_and_comments_do_not_affect_canonical_bytes() {
        let a = process(br#"<cad-task version="1.0" task-id="t1" message-id="m1" timestamp="2020-01-01T00:00:00Z"/>"#, None, &SchemaCatalog::empty()).unwrap();
        let b = process(br#"<!-- hi --><cad-task task-id="t1" message-id="m1" timestamp="2020-01-01T00:00:00Z" version="1.0"/>"#, None, &SchemaCatalog::empty()).unwrap();
        assert_eq!(a.canonical_bytes, b.canonical_bytes);
    }

    #[test]
    fn correlation_overrides_set_in_reply_to() {
        let overrides = CorrelationOverrides::reply_to("req-123");
        let result = process(br#"<cad-result outcome="ok"/>"#, Some(&overrides), &SchemaCatalog::empty()).unwrap();
        let text = String::from_utf8(result.canonical_bytes).unwrap();
        assert!(text.contains(r#"in-reply-to="req-123""#));
    }

    #[test]
    fn unrepairable_input_is_rejected() {
        assert!(matches!(
            process(b"", None, &SchemaCatalog::empty()),
            Err(BusError::PipelineUnrepairable { .. })
        ));
    }
}
