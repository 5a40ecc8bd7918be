//! Translation of JSON documents into configuration nodes.
//!
//! This module interprets plain JSON plus the two key *decorators* that
//! make the format layered:
//!
//! | Key form | Meaning |
//! |---|---|
//! | `name`  | Ordinary translation of the JSON value |
//! | `#name` | Explicit `Value`: the JSON value is stored opaquely, even an array or object |
//! | `&name` | Link family, disambiguated by the value: string → `Reference`, array → `DerivedArray`, object → `DerivedObject` |
//!
//! A derived array encodes each element as `{"element": V}` (or
//! `{"#element": V}` / `{"&element": V}`); a derived object is
//! `{"base": S | [S, ...], "config"?: O | null}`.
//!
//! Translation is purely structural: references and derivations are kept
//! as unresolved variants for the resolver to rewrite later.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use strata_node::{is_valid_node_name, ConfigNode, DerivedObjectNode, NodePath};

use crate::error::ConfigError;

/// Translate a JSON object into an `Object` configuration node.
///
/// `current_path` is the node path of the object being translated; it
/// only feeds diagnostics. Decorators on member keys are interpreted
/// recursively throughout the document.
pub fn config_node_from_json(
    object: &Map<String, Value>,
    current_path: &NodePath,
) -> Result<ConfigNode, ConfigError> {
    read_object(object, current_path)
}

fn schema(path: &NodePath, message: impl Into<String>) -> ConfigError {
    ConfigError::Schema {
        node_path: path.to_string(),
        message: message.into(),
    }
}

fn split_decorator(key: &str) -> (Option<char>, &str) {
    match key.chars().next() {
        Some(decorator @ ('#' | '&')) => (Some(decorator), &key[1..]),
        _ => (None, key),
    }
}

fn read_value(value: &Value, current_path: &NodePath) -> Result<ConfigNode, ConfigError> {
    match value {
        Value::Null => Ok(ConfigNode::Null),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            Ok(ConfigNode::Value(value.clone()))
        }
        Value::Array(elements) => {
            let mut nodes = Vec::with_capacity(elements.len());
            for (index, element) in elements.iter().enumerate() {
                nodes.push(read_value(
                    element,
                    &current_path.join(&index.to_string()),
                )?);
            }
            Ok(ConfigNode::Array(nodes))
        }
        Value::Object(members) => read_object(members, current_path),
    }
}

fn read_object(
    object: &Map<String, Value>,
    current_path: &NodePath,
) -> Result<ConfigNode, ConfigError> {
    let mut members: IndexMap<String, ConfigNode> = IndexMap::with_capacity(object.len());

    for (key, value) in object {
        let (decorator, name) = split_decorator(key);

        if !is_valid_node_name(name) {
            return Err(schema(
                current_path,
                format!("invalid member name `{name}`"),
            ));
        }
        // Decorated and undecorated spellings of one name collide: the
        // JSON parser only deduplicates the raw keys.
        if members.contains_key(name) {
            return Err(schema(
                current_path,
                format!("duplicate member name `{name}`"),
            ));
        }

        let member_path = current_path.join(name);
        let node = match decorator {
            Some('#') => ConfigNode::Value(value.clone()),
            Some('&') => read_link(value, &member_path)?,
            _ => read_value(value, &member_path)?,
        };
        members.insert(name.to_string(), node);
    }

    Ok(ConfigNode::Object(members))
}

/// Dispatch for a `&`-decorated value.
fn read_link(value: &Value, current_path: &NodePath) -> Result<ConfigNode, ConfigError> {
    match value {
        Value::String(target) => read_reference(target, current_path),
        Value::Array(elements) => read_derived_array(elements, current_path),
        Value::Object(members) => read_derived_object(members, current_path),
        _ => Err(schema(
            current_path,
            "a `&` member must hold a string, an array, or an object",
        )),
    }
}

fn read_reference(target: &str, current_path: &NodePath) -> Result<ConfigNode, ConfigError> {
    NodePath::parse(target)
        .map(ConfigNode::Reference)
        .map_err(|_| schema(current_path, format!("invalid node reference `{target}`")))
}

fn read_derived_array(
    elements: &[Value],
    current_path: &NodePath,
) -> Result<ConfigNode, ConfigError> {
    let mut nodes = Vec::with_capacity(elements.len());

    for element in elements {
        let Value::Object(item) = element else {
            return Err(schema(
                current_path,
                "each derived array element must be a JSON object",
            ));
        };
        if item.len() != 1 {
            return Err(schema(
                current_path,
                "each derived array element must hold exactly one `element` member",
            ));
        }

        let (key, value) = item.iter().next().expect("checked length");
        let (decorator, name) = split_decorator(key);
        if name != "element" {
            return Err(schema(
                current_path,
                format!("unexpected derived array element member `{name}`"),
            ));
        }

        let node = match decorator {
            Some('#') => ConfigNode::Value(value.clone()),
            Some('&') => read_link(value, current_path)?,
            _ => read_value(value, current_path)?,
        };
        nodes.push(node);
    }

    Ok(ConfigNode::DerivedArray(nodes))
}

fn read_derived_object(
    object: &Map<String, Value>,
    current_path: &NodePath,
) -> Result<ConfigNode, ConfigError> {
    let parse_base = |base: &str| {
        NodePath::parse(base)
            .map_err(|_| schema(current_path, format!("invalid base node path `{base}`")))
    };

    let mut bases = Vec::new();
    match object.get("base") {
        Some(Value::String(base)) => bases.push(parse_base(base)?),
        Some(Value::Array(entries)) => {
            for entry in entries {
                let Value::String(base) = entry else {
                    return Err(schema(
                        current_path,
                        "every entry of the `base` member must be a string",
                    ));
                };
                bases.push(parse_base(base)?);
            }
            if bases.is_empty() {
                return Err(schema(current_path, "the `base` member is empty"));
            }
        }
        Some(_) => {
            return Err(schema(
                current_path,
                "the `base` member must be a string or an array of strings",
            ))
        }
        None => {
            return Err(schema(
                current_path,
                "a derived object is missing the `base` member",
            ))
        }
    }

    let config = match object.get("config") {
        None | Some(Value::Null) => ConfigNode::Null,
        Some(Value::Object(members)) => read_object(members, current_path)?,
        Some(_) => {
            return Err(schema(
                current_path,
                "the `config` member of a derived object must be an object or null",
            ))
        }
    };

    Ok(ConfigNode::DerivedObject(DerivedObjectNode::new(
        bases, config,
    )))
}
