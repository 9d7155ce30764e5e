//! Phase A — structural repair.
//!
//! Tokenizes the raw input with a permissive reader that tolerates unclosed
//! tags, truncation, and mismatched end names; retains only top-level
//! element subtrees (comments, processing instructions, the XML declaration,
//! and doctype nodes are discarded at every depth); then verifies the
//! reconstruction with a strict re-parse. If strict verification still
//! fails, a second, blank-text-stripping tolerant pass becomes the repaired
//! form.

use crate::tree::{Attr, Element, QName};
use crate::xmlio::render;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::sync::LazyLock;
use swarmbus_redaction::SecretRedactor;
use swarmbus_utils::BusError;

/// Shared redactor for the snippets logged alongside unrepairable input.
/// Falls back to logging nothing extra if the pattern table fails to
/// compile, which should never happen in practice.
static REDACTOR: LazyLock<Option<SecretRedactor>> = LazyLock::new(|| SecretRedactor::new().ok());

fn redacted_snippet(raw: &[u8]) -> String {
    const MAX_LEN: usize = 200;
    let lossy = String::from_utf8_lossy(&raw[..raw.len().min(MAX_LEN)]);
    match REDACTOR.as_ref() {
        Some(redactor) => redactor.redact(&lossy),
        None => lossy.into_owned(),
    }
}

pub fn repair(raw: &[u8]) -> Result<Element, BusError> {
    let candidates = tolerant_parse(raw, false);
    let Some(root) = candidates.into_iter().next() else {
        tracing::warn!(input = %redacted_snippet(raw), "input contains no element content");
        return Err(BusError::PipelineUnrepairable {
            reason: "input contains no element content".to_string(),
        });
    };

    let reconstructed = render(&root);
    if strict_verify(&reconstructed) {
        return Ok(root);
    }

    tracing::debug!("strict re-parse failed after tolerant repair, falling back to recovery pass");
    let recovered = tolerant_parse(&reconstructed, true);
    recovered.into_iter().next().ok_or_else(|| {
        tracing::warn!(input = %redacted_snippet(raw), "recovery pass produced no element content");
        BusError::PipelineUnrepairable { reason: "recovery pass produced no element content".to_string() }
    })
}

/// True if `bytes` parses start-to-finish without error under a strict
/// (non-tolerant) configuration. Does not build a tree — only checks
/// well-formedness.
fn strict_verify(bytes: &[u8]) -> bool {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().check_end_names = true;
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
        buf.clear();
    }
}

/// Permissive parse: tolerates mismatched end-tag names and truncation by
/// auto-closing whatever is still open when the reader gives up. Comments,
/// processing instructions, the XML declaration, and doctype nodes are
/// dropped as they're encountered; only element and text content survives.
fn tolerant_parse(raw: &[u8], trim_text: bool) -> Vec<Element> {
    let mut reader = Reader::from_reader(raw);
    reader.config_mut().trim_text(trim_text);
    reader.config_mut().check_end_names = false;

    let mut stack: Vec<Element> = Vec::new();
    let mut top_level: Vec<Element> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(ref e)) => stack.push(element_from_start(e)),
            Ok(Event::Empty(ref e)) => attach(&mut stack, &mut top_level, element_from_start(e)),
            Ok(Event::End(_)) => {
                if let Some(finished) = stack.pop() {
                    attach(&mut stack, &mut top_level, finished);
                }
                // An end tag with nothing open on the stack is junk; ignore it.
            }
            Ok(Event::Text(ref e)) => push_text(&mut stack, e.unescape().ok().map(|c| c.into_owned()), trim_text),
            Ok(Event::CData(ref e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                push_text(&mut stack, Some(text), trim_text);
            }
            // Comment, PI, Decl, DocType: discarded at every depth.
            Ok(_) => {}
            Err(_) => break,
        }
        buf.clear();
    }

    // Truncated input: whatever is still open gets force-closed, innermost first.
    while let Some(finished) = stack.pop() {
        attach(&mut stack, &mut top_level, finished);
    }

    top_level
}

fn push_text(stack: &mut [Element], text: Option<String>, trim_text: bool) {
    let Some(text) = text else { return };
    let Some(top) = stack.last_mut() else { return };
    if trim_text {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            top.push_text(trimmed.to_string());
        }
    } else if !text.is_empty() {
        top.push_text(text);
    }
}

fn attach(stack: &mut Vec<Element>, top_level: &mut Vec<Element>, elem: Element) {
    match stack.last_mut() {
        Some(parent) => parent.push_child(elem),
        None => top_level.push(elem),
    }
}

fn element_from_start(e: &BytesStart) -> Element {
    let name = QName::parse(&String::from_utf8_lossy(e.name().as_ref()));
    let mut element = Element::new(name);
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
        element.attrs.push(Attr { key, value });
    }
    element
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_truncated_unclosed_tag() {
        let root = repair(b"<cad-task>broken</cad").unwrap();
        assert_eq!(root.name.local, "cad-task");
    }

    #[test]
    fn strips_comments_and_pis() {
        let root = repair(b"<?xml version=\"1.0\"?><!-- hi --><cad-task version=\"1.0\"><!-- x --><step/></cad-task>").unwrap();
        assert_eq!(root.name.local, "cad-task");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn well_formed_input_round_trips() {
        let root = repair(br#"<cad-task version="1.0">test</cad-task>"#).unwrap();
        assert_eq!(root.name.local, "cad-task");
        assert_eq!(root.attr("version"), Some("1.0"));
    }

    #[test]
    fn empty_input_is_unrepairable() {
        assert!(repair(b"   ").is_err());
        assert!(repair(b"<!-- only a comment -->").is_err());
    }
}
