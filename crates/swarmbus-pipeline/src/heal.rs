//! Phase B — heal & validate.
//!
//! A repaired tree that some loaded schema already accepts unchanged passes
//! straight through (core fields aside). Otherwise a new tree is built with
//! the same root name and namespace declarations, a `<huh>` diagnostic
//! records the repair, and either schema-guided or aggressive healing fills
//! in the survivors.

use crate::tree::{Attr, Element, Node, QName};
use swarmbus_schema::{Schema, SchemaCatalog, RESERVED_CHILD_NAMES};
use swarmbus_utils::timestamps::now_iso8601;
use uuid::Uuid;

/// Root attributes schema-guided healing retains; everything else is dropped.
const RESERVED_ROOT_ATTRS: &[&str] = &["message-id", "timestamp", "in-reply-to", "version", "task-id"];

pub fn heal(root: Element, schemas: &SchemaCatalog) -> Element {
    let child_names: Vec<&str> = root.child_local_names().collect();

    // `validate_against_any` only judges child element names; a root with an
    // unknown attribute but all-allowed (or no) children validates vacuously
    // here and is returned unhealed. This is the catalog's known gap (no XSD
    // crate in the dependency stack), not full schema validation.
    if schemas.validate_against_any(child_names.iter().copied()).is_some() {
        let mut root = root;
        ensure_core_fields(&mut root);
        return root;
    }

    if schemas.is_empty() && already_healed(&root) {
        let mut root = root;
        ensure_core_fields(&mut root);
        return root;
    }

    let mut healed = Element::new(root.name.clone());
    for decl in root.attrs.iter().filter(|a| is_namespace_decl(&a.key)) {
        healed.attrs.push(decl.clone());
    }

    push_huh(&mut healed, "warning", "Message was repaired");

    if schemas.is_empty() {
        aggressive_heal(&root, &mut healed);
    } else {
        let tentative = schemas.tentative_schema().expect("non-empty catalog always has a tentative schema");
        schema_guided_heal(&root, &mut healed, tentative);
    }

    ensure_core_fields(&mut healed);
    healed
}

/// True once a root already carries a top-level `<huh>` diagnostic and both
/// core fields, so re-running `heal` with no schema catalog loaded (e.g. the
/// `canon` CLI command invoked on its own prior output) is a no-op rather
/// than stacking another "repaired" wrapper on every pass.
fn already_healed(root: &Element) -> bool {
    root.attr("message-id").is_some()
        && root.attr("timestamp").is_some()
        && root.children.iter().any(|c| matches!(c, Node::Element(e) if e.name.local == "huh"))
}

fn is_namespace_decl(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

fn aggressive_heal(src: &Element, dst: &mut Element) {
    for attr in &src.attrs {
        if !is_namespace_decl(&attr.key) {
            dst.attrs.push(attr.clone());
        }
    }
    for child in &src.children {
        dst.children.push(child.clone());
    }
}

fn schema_guided_heal(src: &Element, dst: &mut Element, schema: &Schema) {
    for child in &src.children {
        match child {
            Node::Element(e) => {
                if schema.allows(&e.name.local) || RESERVED_CHILD_NAMES.contains(&e.name.local.as_str()) {
                    dst.children.push(Node::Element(e.clone()));
                } else {
                    push_huh(dst, "warning", &format!("Removed unknown element <{}>", e.name.local));
                }
            }
            Node::Text(_) => {}
        }
    }

    for attr in &src.attrs {
        if RESERVED_ROOT_ATTRS.contains(&attr.key.as_str()) {
            dst.attrs.push(attr.clone());
        }
    }
}

fn push_huh(parent: &mut Element, severity: &str, message: &str) {
    let mut huh = Element::new(QName::unprefixed("huh"));
    huh.attrs.push(Attr { key: "severity".to_string(), value: severity.to_string() });
    huh.attrs.push(Attr { key: "at".to_string(), value: now_iso8601() });
    huh.push_text(message.to_string());
    parent.children.push(Node::Element(huh));
}

/// Ensures `message-id` and `timestamp` are present on the root. Existing
/// values are never overwritten here — only Phase C may overwrite them.
fn ensure_core_fields(root: &mut Element) {
    if root.attr("message-id").is_none() {
        root.set_attr("message-id", Uuid::new_v4().to_string());
    }
    if root.attr("timestamp").is_none() {
        root.set_attr("timestamp", now_iso8601());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::repair;

    #[test]
    fn aggressive_healing_without_schemas_keeps_children() {
        let root = repair(br#"<cad-task version="1.0"><step a="1"/></cad-task>"#).unwrap();
        let healed = heal(root, &SchemaCatalog::empty());
        assert!(healed.attr("message-id").is_some());
        assert!(healed.attr("timestamp").is_some());
        assert_eq!(healed.attr("version"), Some("1.0"));
        let huh_count = healed.children.iter().filter(|c| matches!(c, Node::Element(e) if e.name.local == "huh")).count();
        assert_eq!(huh_count, 1);
        assert!(healed.children.iter().any(|c| matches!(c, Node::Element(e) if e.name.local == "step")));
    }

    #[test]
    fn never_overwrites_existing_core_fields() {
        let root = repair(br#"<cad-task message-id="fixed-id" timestamp="2020-01-01T00:00:00Z"/>"#).unwrap();
        let healed = heal(root, &SchemaCatalog::empty());
        assert_eq!(healed.attr("message-id"), Some("fixed-id"));
        assert_eq!(healed.attr("timestamp"), Some("2020-01-01T00:00:00Z"));
    }

    #[test]
    fn rehealing_an_already_healed_tree_does_not_stack_another_huh() {
        let root = repair(br#"<cad-task version="1.0"><step a="1"/></cad-task>"#).unwrap();
        let once = heal(root, &SchemaCatalog::empty());
        let twice = heal(once.clone(), &SchemaCatalog::empty());
        let huh_count = |e: &Element| e.children.iter().filter(|c| matches!(c, Node::Element(e) if e.name.local == "huh")).count();
        assert_eq!(huh_count(&once), 1);
        assert_eq!(huh_count(&twice), 1);
        assert_eq!(once.attr("message-id"), twice.attr("message-id"));
    }
}
