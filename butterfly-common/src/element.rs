//! OSM element model shared by the cache layer and the import pipeline
//!
//! Ways carry node references as stored in the source data; resolved
//! coordinates are attached transiently during the transform and never
//! written back to a cache.

use std::collections::BTreeMap;
use std::fmt;

/// Tag set of an element. Keys are unique, iteration order is by key.
pub type Tags = BTreeMap<String, String>;

/// Kind of an OSM element. Each kind has its own id space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Node,
    Way,
    Relation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Node => write!(f, "node"),
            EntityKind::Way => write!(f, "way"),
            EntityKind::Relation => write!(f, "relation"),
        }
    }
}

/// Typed reference to an element: kind plus id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub kind: EntityKind,
    pub id: i64,
}

impl ElementRef {
    pub fn node(id: i64) -> Self {
        Self {
            kind: EntityKind::Node,
            id,
        }
    }

    pub fn way(id: i64) -> Self {
        Self {
            kind: EntityKind::Way,
            id,
        }
    }

    pub fn relation(id: i64) -> Self {
        Self {
            kind: EntityKind::Relation,
            id,
        }
    }
}

/// Elements addressable by id in a cache.
pub trait Element: Clone + Send {
    const KIND: EntityKind;

    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);
}

/// A single point. `lon`/`lat` hold projected x/y once a projection ran.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Node {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
}

impl Node {
    pub fn new(id: i64, lon: f64, lat: f64) -> Self {
        Self { id, lon, lat }
    }
}

impl Element for Node {
    const KIND: EntityKind = EntityKind::Node;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// An ordered path through nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Way {
    pub id: i64,
    pub tags: Tags,
    /// Node ids in path order
    pub refs: Vec<i64>,
    /// Coordinates for `refs`, in the same order. Empty until resolved.
    pub nodes: Vec<Node>,
}

impl Way {
    pub fn new(id: i64, refs: Vec<i64>, tags: Tags) -> Self {
        Self {
            id,
            tags,
            refs,
            nodes: Vec::new(),
        }
    }

    /// A way is closed when its first and last node references are equal.
    pub fn is_closed(&self) -> bool {
        self.refs.len() >= 4 && self.refs.first() == self.refs.last()
    }
}

impl Element for Way {
    const KIND: EntityKind = EntityKind::Way;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

impl From<MemberKind> for EntityKind {
    fn from(kind: MemberKind) -> Self {
        match kind {
            MemberKind::Node => EntityKind::Node,
            MemberKind::Way => EntityKind::Way,
            MemberKind::Relation => EntityKind::Relation,
        }
    }
}

/// Relation member. `way` is filled in when the member is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: i64,
    pub kind: MemberKind,
    pub role: String,
    pub way: Option<Way>,
}

impl Member {
    pub fn new(id: i64, kind: MemberKind, role: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            role: role.into(),
            way: None,
        }
    }

    pub fn element_ref(&self) -> ElementRef {
        ElementRef {
            kind: self.kind.into(),
            id: self.id,
        }
    }
}
