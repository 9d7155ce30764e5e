//! The canonical namespace table: a fixed, process-wide, bidirectional and
//! injective mapping from short prefix to namespace URI.
//!
//! URIs not present in this table retain whatever prefix they arrived with;
//! see the pipeline's Phase D namespace rewrite.

use std::collections::HashMap;
use std::sync::LazyLock;

/// The authoritative list of canonical (prefix, URI) pairs. Single source of
/// truth — add entries here, nowhere else.
static CANONICAL_NAMESPACES: &[(&str, &str)] = &[
    ("cad", "urn:swarmbus:cad"),
    ("mbd", "urn:swarmbus:mbd"),
    ("log", "urn:swarmbus:log"),
    ("swarm", "urn:swarmbus:swarm"),
];

pub struct NamespaceTable {
    prefix_to_uri: HashMap<&'static str, &'static str>,
    uri_to_prefix: HashMap<&'static str, &'static str>,
}

impl NamespaceTable {
    fn build() -> Self {
        let mut prefix_to_uri = HashMap::with_capacity(CANONICAL_NAMESPACES.len());
        let mut uri_to_prefix = HashMap::with_capacity(CANONICAL_NAMESPACES.len());
        for (prefix, uri) in CANONICAL_NAMESPACES {
            prefix_to_uri.insert(*prefix, *uri);
            uri_to_prefix.insert(*uri, *prefix);
        }
        Self { prefix_to_uri, uri_to_prefix }
    }

    /// The canonical prefix for `uri`, if this table carries it.
    pub fn canonical_prefix_for(&self, uri: &str) -> Option<&'static str> {
        self.uri_to_prefix.get(uri).copied()
    }

    /// The URI a canonical `prefix` maps to, if any.
    pub fn uri_for_prefix(&self, prefix: &str) -> Option<&'static str> {
        self.prefix_to_uri.get(prefix).copied()
    }

    /// True if `uri` has a canonical prefix in this table.
    pub fn is_canonical(&self, uri: &str) -> bool {
        self.uri_to_prefix.contains_key(uri)
    }
}

/// The process-wide canonical namespace table.
pub static NAMESPACE_TABLE: LazyLock<NamespaceTable> = LazyLock::new(NamespaceTable::build);
