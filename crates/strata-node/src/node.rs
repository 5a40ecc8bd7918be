//! The configuration node tree.
//!
//! A configuration is a tree of [`ConfigNode`] values. Four variants are
//! *primitive* (`Null`, `Value`, `Array`, `Object`) and three carry
//! unresolved link information (`Reference`, `DerivedArray`,
//! `DerivedObject`). A freshly assembled configuration may contain any of
//! the seven; a resolved configuration contains primitives only (see
//! [`ConfigNode::is_fully_resolved`]).
//!
//! Ownership is strictly tree-shaped: every node is owned by its parent
//! container, and cloning a node yields a fully independent subtree.
//! There are no parent back-pointers; code that needs to walk upward
//! (the resolver) carries the current node's absolute [`NodePath`]
//! explicitly and rebases relative paths against it.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::path::NodePath;

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    /// Absent or empty value.
    Null,

    /// A leaf holding an opaque JSON value.
    ///
    /// Ordinarily a scalar (bool, number, string); with the `#` decorator
    /// any JSON value is stored here unchanged and is never reinterpreted
    /// during resolution.
    Value(Value),

    /// Index-addressable children.
    Array(Vec<ConfigNode>),

    /// Name-addressable children with stable iteration order.
    Object(IndexMap<String, ConfigNode>),

    /// Unresolved link to another node, by path.
    Reference(NodePath),

    /// Array whose elements may themselves be unresolved; rewritten to a
    /// plain `Array` once every element resolves.
    DerivedArray(Vec<ConfigNode>),

    /// Object materialised by overlaying base nodes and then overrides.
    DerivedObject(DerivedObjectNode),
}

/// Payload of a [`ConfigNode::DerivedObject`].
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedObjectNode {
    /// Base node paths, overlaid left to right when the node is materialised.
    pub bases: Vec<NodePath>,

    /// Overrides applied after the bases; always `Null` or `Object`.
    pub config: Box<ConfigNode>,
}

impl DerivedObjectNode {
    /// Create a derived object payload. `bases` must be non-empty.
    pub fn new(bases: Vec<NodePath>, config: ConfigNode) -> Self {
        debug_assert!(!bases.is_empty(), "a derived object needs at least one base");
        Self {
            bases,
            config: Box::new(config),
        }
    }
}

/// The variant of a [`ConfigNode`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Value,
    Array,
    Object,
    Reference,
    DerivedArray,
    DerivedObject,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Null => "Null",
            NodeKind::Value => "Value",
            NodeKind::Array => "Array",
            NodeKind::Object => "Object",
            NodeKind::Reference => "Reference",
            NodeKind::DerivedArray => "DerivedArray",
            NodeKind::DerivedObject => "DerivedObject",
        };
        f.write_str(name)
    }
}

impl ConfigNode {
    /// Create an empty `Object` node.
    pub fn object() -> Self {
        ConfigNode::Object(IndexMap::new())
    }

    /// Create an empty `Array` node.
    pub fn array() -> Self {
        ConfigNode::Array(Vec::new())
    }

    /// This node's variant.
    pub fn kind(&self) -> NodeKind {
        match self {
            ConfigNode::Null => NodeKind::Null,
            ConfigNode::Value(_) => NodeKind::Value,
            ConfigNode::Array(_) => NodeKind::Array,
            ConfigNode::Object(_) => NodeKind::Object,
            ConfigNode::Reference(_) => NodeKind::Reference,
            ConfigNode::DerivedArray(_) => NodeKind::DerivedArray,
            ConfigNode::DerivedObject(_) => NodeKind::DerivedObject,
        }
    }

    /// Check if this is a `Null` node.
    pub fn is_null(&self) -> bool {
        matches!(self, ConfigNode::Null)
    }

    /// Check if this is a `Value` node.
    pub fn is_value(&self) -> bool {
        matches!(self, ConfigNode::Value(_))
    }

    /// Check if this is an `Array` node.
    pub fn is_array(&self) -> bool {
        matches!(self, ConfigNode::Array(_))
    }

    /// Check if this is an `Object` node.
    pub fn is_object(&self) -> bool {
        matches!(self, ConfigNode::Object(_))
    }

    /// Get the JSON payload if this is a `Value` node.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ConfigNode::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Get the elements if this is an `Array` node.
    pub fn as_array(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Array(elements) => Some(elements),
            _ => None,
        }
    }

    /// Get the members if this is an `Object` node.
    pub fn as_object(&self) -> Option<&IndexMap<String, ConfigNode>> {
        match self {
            ConfigNode::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Mutable access to the members if this is an `Object` node.
    pub fn as_object_mut(&mut self) -> Option<&mut IndexMap<String, ConfigNode>> {
        match self {
            ConfigNode::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Look up a member by name on an `Object` node.
    pub fn member(&self, name: &str) -> Option<&ConfigNode> {
        self.as_object().and_then(|members| members.get(name))
    }

    /// Check whether an `Object` node has a member with the given name.
    pub fn contains_member(&self, name: &str) -> bool {
        self.member(name).is_some()
    }

    /// Iterate over the member names of an `Object` node.
    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.as_object()
            .into_iter()
            .flat_map(|members| members.keys().map(String::as_str))
    }

    /// Replace-or-insert a member on an `Object` node.
    ///
    /// Returns false (and changes nothing) if this is not an `Object`.
    pub fn set_member(&mut self, name: impl Into<String>, node: ConfigNode) -> bool {
        match self {
            ConfigNode::Object(members) => {
                members.insert(name.into(), node);
                true
            }
            _ => false,
        }
    }

    /// Append an element to an `Array` node.
    ///
    /// Returns false (and changes nothing) if this is not an `Array`.
    pub fn append_element(&mut self, node: ConfigNode) -> bool {
        match self {
            ConfigNode::Array(elements) => {
                elements.push(node);
                true
            }
            _ => false,
        }
    }

    /// Walk an absolute path down from this node.
    ///
    /// `self` is treated as the tree root. Named segments descend into
    /// `Object` members; decimal segments descend into `Array` indices.
    /// Returns `None` on any mismatch: a relative path, an unknown
    /// member, a non-numeric segment on an array, or descent into a node
    /// that is not a container.
    pub fn node_at_path(&self, path: &NodePath) -> Option<&ConfigNode> {
        if !path.is_absolute() {
            return None;
        }
        let mut current = self;
        for segment in path.segments() {
            current = match current {
                ConfigNode::Object(members) => members.get(segment)?,
                ConfigNode::Array(elements) => elements.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable twin of [`ConfigNode::node_at_path`].
    pub fn node_at_path_mut(&mut self, path: &NodePath) -> Option<&mut ConfigNode> {
        if !path.is_absolute() {
            return None;
        }
        let mut current = self;
        for segment in path.segments() {
            current = match current {
                ConfigNode::Object(members) => members.get_mut(segment)?,
                ConfigNode::Array(elements) => elements.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Overlay another `Object` onto this one.
    ///
    /// For each member of `other`: a member absent here is deep-copied
    /// in; when both sides hold an `Object` the overlay recurses;
    /// otherwise the member is replaced by a deep copy of `other`'s.
    /// The result does not depend on `other`'s iteration order.
    ///
    /// Returns false (and changes nothing) unless both nodes are
    /// `Object`s.
    pub fn apply_object(&mut self, other: &ConfigNode) -> bool {
        let ConfigNode::Object(overrides) = other else {
            return false;
        };
        let ConfigNode::Object(members) = self else {
            return false;
        };

        for (name, value) in overrides {
            match members.get_mut(name) {
                Some(existing) if existing.is_object() && value.is_object() => {
                    existing.apply_object(value);
                }
                _ => {
                    members.insert(name.clone(), value.clone());
                }
            }
        }
        true
    }

    /// Check that no unresolved variant is reachable from this node.
    pub fn is_fully_resolved(&self) -> bool {
        match self {
            ConfigNode::Null | ConfigNode::Value(_) => true,
            ConfigNode::Array(elements) => elements.iter().all(ConfigNode::is_fully_resolved),
            ConfigNode::Object(members) => members.values().all(ConfigNode::is_fully_resolved),
            ConfigNode::Reference(_)
            | ConfigNode::DerivedArray(_)
            | ConfigNode::DerivedObject(_) => false,
        }
    }

    /// Project a fully resolved tree onto a JSON value.
    ///
    /// Returns `None` if any unresolved variant remains. This is a
    /// display facility for resolved trees, not a configuration writer:
    /// decorators and include directives are never emitted.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            ConfigNode::Null => Some(Value::Null),
            ConfigNode::Value(value) => Some(value.clone()),
            ConfigNode::Array(elements) => elements
                .iter()
                .map(ConfigNode::to_json)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            ConfigNode::Object(members) => {
                let mut map = serde_json::Map::with_capacity(members.len());
                for (name, node) in members {
                    map.insert(name.clone(), node.to_json()?);
                }
                Some(Value::Object(map))
            }
            ConfigNode::Reference(_)
            | ConfigNode::DerivedArray(_)
            | ConfigNode::DerivedObject(_) => None,
        }
    }
}
