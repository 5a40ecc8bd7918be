//! Iterative fixed-point resolution of references and derivations.
//!
//! An assembled configuration may still contain `Reference`,
//! `DerivedArray`, and `DerivedObject` nodes. [`resolve_tree`] rewrites
//! them in place until only primitive variants remain.
//!
//! # Design
//!
//! Each pass clones the tree once and uses the clone as an immutable
//! lookup snapshot while the live tree is rewritten in place; lookups
//! therefore observe the state the pass started from. The outer loop runs
//! at most `max_cycles` passes, which bounds the depth of mutual
//! dependencies a configuration may express: a chain of depth *d*
//! resolves in exactly *d* passes and fails with
//! [`ConfigError::Unresolved`] when the budget is smaller.
//!
//! Lookups originate at the *parent* of the unresolved node, so a
//! `..`-prefixed reference or base path naturally names the parent's
//! siblings. There are no parent pointers in the tree; the recursion
//! carries each node's absolute path and rebases relative targets against
//! it.

use strata_node::{ConfigNode, NodePath};

use crate::error::ConfigError;

/// Outcome of one resolution pass over a subtree.
///
/// Structural failures are reported separately as `Err(ConfigError)`;
/// `Unresolved` only ever means "not yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The subtree contains only primitive variants.
    Resolved,
    /// At least one node could not be rewritten in this pass.
    Unresolved,
}

/// Resolve a configuration tree in place.
///
/// Runs up to `max_cycles` passes and stops as soon as a pass reports the
/// tree fully resolved. A pass that rewrites nothing cannot be followed
/// by one that does, so such a pass ends the loop early; the error is the
/// same [`ConfigError::Unresolved`] either way.
///
/// # Panics
///
/// Panics if `max_cycles` is zero; the bound is a programmer-supplied
/// invariant, not user input.
pub fn resolve_tree(root: &mut ConfigNode, max_cycles: u32) -> Result<(), ConfigError> {
    assert!(
        max_cycles > 0,
        "reference resolution max cycles must be greater than zero"
    );

    for cycle in 0..max_cycles {
        let snapshot = root.clone();
        match resolve_node(root, &NodePath::root(), &snapshot)? {
            Resolution::Resolved => {
                tracing::trace!(cycles = cycle + 1, "configuration fully resolved");
                return Ok(());
            }
            Resolution::Unresolved => {
                if *root == snapshot {
                    tracing::debug!(
                        cycles = cycle + 1,
                        "resolution pass made no progress, giving up"
                    );
                    break;
                }
            }
        }
    }

    Err(ConfigError::Unresolved { cycles: max_cycles })
}

fn resolution_error(path: &NodePath, message: impl Into<String>) -> ConfigError {
    ConfigError::Resolution {
        node_path: path.to_string(),
        message: message.into(),
    }
}

fn resolve_node(
    node: &mut ConfigNode,
    path: &NodePath,
    root: &ConfigNode,
) -> Result<Resolution, ConfigError> {
    match node {
        ConfigNode::Null | ConfigNode::Value(_) => Ok(Resolution::Resolved),

        ConfigNode::Array(elements) => {
            let mut result = Resolution::Resolved;
            for (index, element) in elements.iter_mut().enumerate() {
                match resolve_node(element, &path.join(&index.to_string()), root)? {
                    Resolution::Resolved => {}
                    Resolution::Unresolved => result = Resolution::Unresolved,
                }
            }
            Ok(result)
        }

        ConfigNode::Object(members) => {
            let mut result = Resolution::Resolved;
            for (name, member) in members.iter_mut() {
                match resolve_node(member, &path.join(name), root)? {
                    Resolution::Resolved => {}
                    Resolution::Unresolved => result = Resolution::Unresolved,
                }
            }
            Ok(result)
        }

        ConfigNode::Reference(_) => resolve_reference(node, path, root),
        ConfigNode::DerivedArray(_) => resolve_derived_array(node, path, root),
        ConfigNode::DerivedObject(_) => resolve_derived_object(node, path, root),
    }
}

fn resolve_reference(
    node: &mut ConfigNode,
    path: &NodePath,
    root: &ConfigNode,
) -> Result<Resolution, ConfigError> {
    let ConfigNode::Reference(target) = &*node else {
        unreachable!("caller matched the variant");
    };

    let Some(parent) = path.parent() else {
        return Err(resolution_error(path, "reference node has no parent"));
    };

    let Some(absolute) = target.to_absolute(&parent) else {
        // `..` climbing past the root cannot name a node; other
        // derivations may still rewrite the tree, so this is not fatal.
        return Ok(Resolution::Unresolved);
    };
    let Some(referenced) = root.node_at_path(&absolute) else {
        return Ok(Resolution::Unresolved);
    };

    *node = referenced.clone();
    Ok(if node.is_fully_resolved() {
        Resolution::Resolved
    } else {
        Resolution::Unresolved
    })
}

fn resolve_derived_array(
    node: &mut ConfigNode,
    path: &NodePath,
    root: &ConfigNode,
) -> Result<Resolution, ConfigError> {
    if path.parent().is_none() {
        return Err(resolution_error(path, "derived array node has no parent"));
    }
    let ConfigNode::DerivedArray(elements) = node else {
        unreachable!("caller matched the variant");
    };

    let mut result = Resolution::Resolved;
    for (index, element) in elements.iter_mut().enumerate() {
        match resolve_node(element, &path.join(&index.to_string()), root) {
            Ok(Resolution::Resolved) => {}
            Ok(Resolution::Unresolved) => result = Resolution::Unresolved,
            Err(error) => {
                tracing::debug!(index, path = %path, "failed to resolve a derived array element");
                return Err(error);
            }
        }
    }

    if result == Resolution::Resolved {
        let elements = std::mem::take(elements);
        *node = ConfigNode::Array(elements);
    }
    Ok(result)
}

fn resolve_derived_object(
    node: &mut ConfigNode,
    path: &NodePath,
    root: &ConfigNode,
) -> Result<Resolution, ConfigError> {
    let Some(parent) = path.parent() else {
        return Err(resolution_error(path, "derived object node has no parent"));
    };
    let ConfigNode::DerivedObject(derived) = node else {
        unreachable!("caller matched the variant");
    };

    // Overlay the bases, declared order, onto a fresh object. Every base
    // must already be fully resolved; otherwise the overlay would copy
    // unresolved nodes whose relative targets no longer hold.
    let mut accumulator = ConfigNode::object();
    for base in &derived.bases {
        let Some(absolute) = base.to_absolute(&parent) else {
            return Ok(Resolution::Unresolved);
        };
        let Some(base_node) = root.node_at_path(&absolute) else {
            return Ok(Resolution::Unresolved);
        };
        if !base_node.is_fully_resolved() {
            return Ok(Resolution::Unresolved);
        }
        if !accumulator.apply_object(base_node) {
            return Err(resolution_error(
                path,
                format!("cannot apply base `{base}`: the base is not an Object"),
            ));
        }
    }

    if !derived.config.is_fully_resolved() {
        let mut overrides = (*derived.config).clone();
        // The pending overrides stand in for this node during their own
        // resolution: grafting them over this node's slot in the lookup
        // snapshot lets their relative references reach both the node's
        // siblings and other members of the overrides themselves.
        let mut patched = root.clone();
        if let Some(slot) = patched.node_at_path_mut(path) {
            *slot = overrides.clone();
        }

        match resolve_node(&mut overrides, path, &patched) {
            Ok(Resolution::Resolved) => {
                derived.config = Box::new(overrides);
            }
            Ok(Resolution::Unresolved) => {
                // Keep the partial progress for the next pass.
                derived.config = Box::new(overrides);
                return Ok(Resolution::Unresolved);
            }
            Err(error) => {
                tracing::debug!(path = %path, "failed to resolve derived object overrides");
                return Err(error);
            }
        }
    }

    if !derived.config.is_null() {
        if !accumulator.apply_object(&derived.config) {
            return Err(resolution_error(
                path,
                "cannot apply the configuration overrides: not an Object",
            ));
        }
    }

    *node = accumulator;
    Ok(Resolution::Resolved)
}
