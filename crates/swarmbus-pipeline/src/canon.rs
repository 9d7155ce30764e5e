//! Phase D — canonicalization: namespace rewrite, attribute sort, then
//! exclusive-C14N-style serialization.

use crate::tree::{Attr, Element, Node};
use crate::xmlio::render;
use std::collections::HashMap;
use swarmbus_utils::namespace::NAMESPACE_TABLE;

pub fn canonicalize(root: &Element) -> Vec<u8> {
    let mut root = root.clone();
    rewrite_namespaces(&mut root, &HashMap::new());
    sort_attrs(&mut root);

    let mut bytes = render(&root);
    while bytes.last().is_some_and(u8::is_ascii_whitespace) {
        bytes.pop();
    }
    bytes.push(b'\n');
    bytes
}

/// `prefix -> URI` in scope at this point in the tree; `None` is the default
/// (unprefixed) namespace.
type NsContext = HashMap<Option<String>, String>;

/// Rewrites namespace declarations to their canonical prefix and re-tags any
/// element whose governing namespace URI is canonical. This is a real rename
/// (not the no-op the source implementation had) per the redesign decision
/// recorded in DESIGN.md.
fn rewrite_namespaces(element: &mut Element, inherited: &NsContext) {
    let mut context = inherited.clone();
    let mut rewritten = Vec::with_capacity(element.attrs.len());

    for attr in std::mem::take(&mut element.attrs) {
        match namespace_decl_prefix(&attr.key) {
            Some(declared_prefix) => {
                context.insert(declared_prefix, attr.value.clone());
                let new_key = match NAMESPACE_TABLE.canonical_prefix_for(&attr.value) {
                    Some(canonical_prefix) => format!("xmlns:{canonical_prefix}"),
                    None => attr.key.clone(),
                };
                rewritten.push(Attr { key: new_key, value: attr.value });
            }
            None => rewritten.push(attr),
        }
    }
    element.attrs = rewritten;

    if let Some(uri) = context.get(&element.name.prefix) {
        if let Some(canonical_prefix) = NAMESPACE_TABLE.canonical_prefix_for(uri) {
            element.name.prefix = Some(canonical_prefix.to_string());
        }
    }

    for child in &mut element.children {
        if let Node::Element(e) = child {
            rewrite_namespaces(e, &context);
        }
    }
}

fn namespace_decl_prefix(key: &str) -> Option<Option<String>> {
    if key == "xmlns" {
        Some(None)
    } else {
        key.strip_prefix("xmlns:").map(|p| Some(p.to_string()))
    }
}

fn sort_attrs(element: &mut Element) {
    element.attrs.sort_by(|a, b| a.key.as_bytes().cmp(b.key.as_bytes()));
    for child in &mut element.children {
        if let Node::Element(e) = child {
            sort_attrs(e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repair::repair;

    #[test]
    fn sorts_attributes_byte_wise() {
        let mut root = repair(br#"<cad-task zeta="1" alpha="2"/>"#).unwrap();
        sort_attrs(&mut root);
        assert_eq!(root.attrs[0].key, "alpha");
        assert_eq!(root.attrs[1].key, "zeta");
    }

    #[test]
    fn rewrites_tag_and_declaration_to_canonical_prefix() {
        let mut root = repair(br#"<x:task xmlns:x="urn:swarmbus:cad"><x:step/></x:task>"#).unwrap();
        rewrite_namespaces(&mut root, &HashMap::new());
        assert_eq!(root.name.prefix.as_deref(), Some("cad"));
        assert_eq!(root.attrs[0].key, "xmlns:cad");
        let Node::Element(child) = &root.children[0] else { panic!("expected element child") };
        assert_eq!(child.name.prefix.as_deref(), Some("cad"));
    }

    #[test]
    fn unknown_namespace_keeps_arrival_prefix() {
        let mut root = repair(br#"<x:task xmlns:x="urn:something:else"/>"#).unwrap();
        rewrite_namespaces(&mut root, &HashMap::new());
        assert_eq!(root.name.prefix.as_deref(), Some("x"));
        assert_eq!(root.attrs[0].key, "xmlns:x");
    }

    #[test]
    fn canonical_output_ends_with_single_newline() {
        let root = repair(br#"<cad-task version="1.0"/>"#).unwrap();
        let bytes = canonicalize(&root);
        assert!(bytes.ends_with(b"\n"));
        assert!(!bytes.ends_with(b"\n\n"));
    }
}
