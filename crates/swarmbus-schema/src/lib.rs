//! Schema catalog: recursive discovery of schema files and validate-against-any.
//!
//! A full XSD validator is out of scope for this workspace's dependency
//! stack; a [`Schema`] is therefore a lightweight compiled fact about one
//! schema file — its declared target namespace and the set of element local
//! names it permits anywhere in the document — which is exactly what Phase B
//! healing needs to decide "does this tree validate unchanged" and "what is
//! allowed during schema-guided healing".

use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;
use tracing::warn;

/// Root attributes and child elements that are always allowed regardless of
/// what a schema declares — the pipeline's own bookkeeping vocabulary.
pub const RESERVED_CHILD_NAMES: &[&str] = &["huh", "message-id", "timestamp"];

#[derive(Debug, thiserror::Error)]
#[error("failed to load schema {path}: {reason}")]
pub struct SchemaLoadError {
    pub path: Utf8PathBuf,
    pub reason: String,
}

/// An immutable compiled schema definition.
#[derive(Debug, Clone)]
pub struct Schema {
    key: String,
    namespace: Option<String>,
    source_path: Utf8PathBuf,
    allowed_elements: HashSet<String>,
}

impl Schema {
    /// The catalog index key: the declared target namespace URI, or the
    /// source file's stem when no target namespace is declared.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn source_path(&self) -> &Utf8Path {
        &self.source_path
    }

    /// True if `local_name` is an element this schema permits anywhere in
    /// the document.
    pub fn allows(&self, local_name: &str) -> bool {
        self.allowed_elements.contains(local_name)
    }

    fn local_name_of(qname: &[u8]) -> String {
        let s = String::from_utf8_lossy(qname);
        match s.split_once(':') {
            Some((_, local)) => local.to_string(),
            None => s.into_owned(),
        }
    }

    fn load(path: &Utf8Path) -> Result<Schema, SchemaLoadError> {
        let err = |reason: String| SchemaLoadError { path: path.to_owned(), reason };

        let bytes = std::fs::read(path).map_err(|e| err(e.to_string()))?;
        let mut reader = Reader::from_reader(bytes.as_slice());
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut namespace = None;
        let mut allowed_elements = HashSet::new();
        let mut depth: usize = 0;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| err(e.to_string()))?;
            match event {
                Event::Eof => break,
                Event::Start(ref e) => {
                    let local = Self::local_name_of(e.name().as_ref());

                    if depth == 0 {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"targetNamespace" {
                                namespace =
                                    Some(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }

                    if local.eq_ignore_ascii_case("element") {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"name" {
                                allowed_elements
                                    .insert(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }

                    depth += 1;
                }
                Event::Empty(ref e) => {
                    let local = Self::local_name_of(e.name().as_ref());

                    if depth == 0 {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"targetNamespace" {
                                namespace =
                                    Some(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }

                    if local.eq_ignore_ascii_case("element") {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"name" {
                                allowed_elements
                                    .insert(String::from_utf8_lossy(&attr.value).into_owned());
                            }
                        }
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                }
                _ => {}
            }
            buf.clear();
        }

        let key = namespace.clone().unwrap_or_else(|| {
            path.file_stem().map(str::to_string).unwrap_or_else(|| path.to_string())
        });

        Ok(Schema { key, namespace, source_path: path.to_owned(), allowed_elements })
    }
}

/// Loaded schemas, kept sorted ascending by [`Schema::key`] so that schema
/// selection during healing is deterministic.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    schemas: Vec<Schema>,
}

fn xsd_matcher() -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    builder.add(Glob::new("*.xsd").expect("static glob is valid"));
    builder.build().expect("static globset is valid")
}

fn walk(dir: &Utf8Path, matcher: &GlobSet, paths: &mut Vec<Utf8PathBuf>) -> std::io::Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = match Utf8PathBuf::try_from(entry.path()) {
            Ok(p) => p,
            Err(_) => continue,
        };
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            continue;
        }
        if path.is_dir() {
            walk(&path, matcher, paths)?;
        } else if matcher.is_match(path.file_name().unwrap_or_default()) {
            paths.push(path);
        }
    }
    Ok(())
}

impl SchemaCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Recursively discovers `*.xsd` files under `dirs`. Per-file failures
    /// are logged and skipped; this never fails bus construction.
    pub fn discover(dirs: &[Utf8PathBuf]) -> Self {
        let matcher = xsd_matcher();
        let mut paths = Vec::new();
        for dir in dirs {
            if let Err(e) = walk(dir, &matcher, &mut paths) {
                warn!(dir = %dir, error = %e, "schema directory walk failed");
            }
        }

        let mut schemas = Vec::new();
        for path in paths {
            match Schema::load(&path) {
                Ok(schema) => schemas.push(schema),
                Err(e) => warn!(error = %e, "schema load failed, skipping"),
            }
        }
        schemas.sort_by(|a, b| a.key.cmp(&b.key));
        Self { schemas }
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn lookup_by_namespace(&self, namespace: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.namespace.as_deref() == Some(namespace))
    }

    /// The first schema (in ascending key order) that accepts every name in
    /// `child_local_names` unchanged — either schema-allowed or reserved.
    ///
    /// Judges child element names only, not attributes: a root carrying an
    /// unknown attribute but otherwise-allowed children still validates here.
    /// This is an approximation (no XSD validator in the dependency stack),
    /// not full schema validation.
    pub fn validate_against_any<'a, I>(&self, child_local_names: I) -> Option<&Schema>
    where
        I: IntoIterator<Item = &'a str> + Clone,
    {
        self.schemas.iter().find(|schema| {
            child_local_names
                .clone()
                .into_iter()
                .all(|name| RESERVED_CHILD_NAMES.contains(&name) || schema.allows(name))
        })
    }

    /// The deterministic tentative schema for healing when no schema fully
    /// validates: the last schema in ascending lexicographic key order.
    pub fn tentative_schema(&self) -> Option<&Schema> {
        self.schemas.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_schema(dir: &Utf8Path, name: &str, content: &str) {
        let path = dir.join(name);
        let mut file = std::fs::File::create(path.as_std_path()).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn discovers_and_sorts_by_key() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        write_schema(
            &dir,
            "b.xsd",
            r#"<xs:schema targetNamespace="urn:swarmbus:mbd"><xs:element name="mbd-task"/></xs:schema>"#,
        );
        write_schema(
            &dir,
            "a.xsd",
            r#"<xs:schema targetNamespace="urn:swarmbus:cad"><xs:element name="cad-task"/></xs:schema>"#,
        );

        let catalog = SchemaCatalog::discover(&[dir]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.tentative_schema().unwrap().key(), "urn:swarmbus:mbd");
    }

    #[test]
    fn validate_against_any_accepts_matching_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        write_schema(
            &dir,
            "cad.xsd",
            r#"<xs:schema targetNamespace="urn:swarmbus:cad"><xs:element name="step"/></xs:schema>"#,
        );
        let catalog = SchemaCatalog::discover(&[dir]);

        assert!(catalog.validate_against_any(["step"]).is_some());
        assert!(catalog.validate_against_any(["message-id"]).is_some());
        assert!(catalog.validate_against_any(["unknown-thing"]).is_none());
    }

    #[test]
    fn missing_namespace_falls_back_to_file_stem() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        write_schema(&dir, "untitled.xsd", r#"<xs:schema><xs:element name="x"/></xs:schema>"#);
        let catalog = SchemaCatalog::discover(&[dir]);
        assert_eq!(catalog.tentative_schema().unwrap().key(), "untitled");
    }
}
