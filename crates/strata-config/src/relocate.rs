//! Reshaping a resolved configuration between node paths.
//!
//! After resolution the caller may ask for a sub-tree of the result
//! (`source_node`) and for that sub-tree to be re-wrapped under a new
//! position (`destination_node`). Both paths are absolute; `/` means
//! "the whole tree" on either side.

use strata_node::{is_valid_node_name, ConfigNode, NodePath};

use crate::error::ConfigError;

/// Extract the `source` sub-tree and wrap it under `destination`.
///
/// Both paths must be absolute (callers validate them when they come
/// from user input). Destination segments must be member names: the
/// wrapper objects built here have no array levels to index into.
pub fn relocate(
    tree: ConfigNode,
    source: &NodePath,
    destination: &NodePath,
) -> Result<ConfigNode, ConfigError> {
    debug_assert!(source.is_absolute() && destination.is_absolute());

    if source.is_root() && destination.is_root() {
        return Ok(tree);
    }

    let extracted = if source.is_root() {
        tree
    } else {
        tree.node_at_path(source)
            .ok_or_else(|| ConfigError::SourceNodeNotFound(source.to_string()))?
            .clone()
    };

    if destination.is_root() {
        return Ok(extracted);
    }

    let segments: Vec<&str> = destination.segments().collect();
    for segment in &segments {
        if !is_valid_node_name(segment) {
            return Err(ConfigError::InvalidDestinationNode(destination.to_string()));
        }
    }

    // Build the wrappers inside out: the last segment holds the
    // extracted sub-tree, every earlier one an intermediate object.
    let mut result = extracted;
    for segment in segments.into_iter().rev() {
        let mut wrapper = ConfigNode::object();
        wrapper.set_member(segment, result);
        result = wrapper;
    }
    Ok(result)
}
