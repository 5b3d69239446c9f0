use std::fmt;

use crate::errors::{Error, Result};

/// Top-level element kinds found in an `.osm` document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

impl ElementKind {
    pub const ALL: [ElementKind; 3] = [ElementKind::Node, ElementKind::Way, ElementKind::Relation];

    pub fn from_name(name: &[u8]) -> Option<ElementKind> {
        match name {
            b"node" => Some(ElementKind::Node),
            b"way" => Some(ElementKind::Way),
            b"relation" => Some(ElementKind::Relation),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Node => "node",
            ElementKind::Way => "way",
            ElementKind::Relation => "relation",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A nested `tag`, `nd` or `member` entry, attributes kept in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl Child {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        lookup(&self.attributes, key)
    }
}

/// Key/value annotation borrowed from a `tag` child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagEntry<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// One node, way or relation as it appears in the document. Lives for a
/// single iteration of the element stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Child>,
}

impl Element {
    pub fn new(kind: ElementKind) -> Element {
        Element {
            kind,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        lookup(&self.attributes, key)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.attribute(key)
            .ok_or_else(|| Error::missing_attribute(self.kind.as_str(), key))
    }

    pub fn id(&self) -> Result<&str> {
        self.require("id")
    }

    /// Children named `tag`, in document order. Fails on the first entry
    /// lacking `k` or `v`.
    pub fn tags(&self) -> impl Iterator<Item = Result<TagEntry<'_>>> {
        self.children_named("tag").map(move |child| {
            match (child.attribute("k"), child.attribute("v")) {
                (Some(key), Some(value)) => Ok(TagEntry { key, value }),
                _ => Err(Error::MalformedTag {
                    element_id: self.attribute("id").unwrap_or("?").to_string(),
                    message: "tag needs both `k` and `v`".to_string(),
                }),
            }
        })
    }

    /// `ref` values of the `nd` children, in document order.
    pub fn node_refs(&self) -> impl Iterator<Item = Result<&str>> {
        self.children_named("nd").map(|child| {
            child
                .attribute("ref")
                .ok_or_else(|| Error::missing_attribute("nd", "ref"))
        })
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Child> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

fn lookup<'a>(attributes: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
