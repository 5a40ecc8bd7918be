//! # strata-node
//!
//! Configuration node tree and node-path utilities for the strata
//! configuration framework.
//!
//! This crate defines the data model shared by the whole framework:
//!
//! - [`ConfigNode`]: a tagged tree with four primitive variants (`Null`,
//!   `Value`, `Array`, `Object`) and three unresolved link variants
//!   (`Reference`, `DerivedArray`, `DerivedObject`);
//! - [`NodePath`]: validated UNIX-style node paths (`/a/b`, `../peer`)
//!   with rebasing arithmetic for relative lookups;
//! - the overlay operation ([`ConfigNode::apply_object`]) that merges one
//!   `Object` onto another with right-side values winning at leaves.
//!
//! Assembling and resolving configurations lives in the `strata-config`
//! crate; this crate is purely the tree.

mod node;
mod path;

pub use node::{ConfigNode, DerivedObjectNode, NodeKind};
pub use path::{
    is_absolute_node_path, is_valid_node_name, is_valid_node_path, InvalidNodePath, NodePath,
    ROOT_PATH,
};
