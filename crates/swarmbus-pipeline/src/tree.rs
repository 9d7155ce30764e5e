//! A minimal, allocation-owned XML element tree.
//!
//! Namespace declarations (`xmlns`, `xmlns:*`) are modeled as ordinary
//! attributes, exactly as `quick_xml::Reader` hands them to us — the
//! canonicalization phase is the only place that gives them namespace
//! meaning. This keeps repair and healing blind to namespaces entirely,
//! matching how the pipeline is specified: only Phase D cares about them.

/// A (possibly prefixed) element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((prefix, local)) => QName { prefix: Some(prefix.to_string()), local: local.to_string() },
            None => QName { prefix: None, local: raw.to_string() },
        }
    }

    pub fn unprefixed(local: impl Into<String>) -> Self {
        QName { prefix: None, local: local.into() }
    }

    pub fn full(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attr {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        }
    }
}

/// One element: tag name, its attributes (namespace declarations included,
/// in arrival order) and its children (mixed element/text content).
#[derive(Debug, Clone)]
pub struct Element {
    pub name: QName,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Element { name, attrs: Vec::new(), children: Vec::new() }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|a| a.key == key).map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(existing) = self.attrs.iter_mut().find(|a| a.key == key) {
            existing.value = value;
        } else {
            self.attrs.push(Attr { key: key.to_string(), value });
        }
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Local names of every direct child element (text nodes excluded).
    pub fn child_local_names(&self) -> impl Iterator<Item = &str> + Clone {
        self.children.iter().filter_map(|n| n.as_element().map(|e| e.name.local.as_str()))
    }
}
