//! Reading and assembling layered configuration files.
//!
//! A configuration file is a JSON object with two optional members:
//!
//! ```json
//! {
//!   "includes": [
//!     { "type": "StrataConfig",
//!       "file_path": "common.json",
//!       "source_node": "/",
//!       "destination_node": "/" }
//!   ],
//!   "config": { "name": "value" }
//! }
//! ```
//!
//! [`ConfigReader::read`] loads the file, recursively reads its includes
//! (each against the directory of the file that named it), overlays the
//! file's own `config` member on top, resolves every reference and
//! derivation, and finally relocates the result between the requested
//! source and destination node paths.
//!
//! Include graphs must be acyclic; the reader does not detect cycles.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use strata_node::{ConfigNode, NodePath, ROOT_PATH};

use crate::convert;
use crate::error::ConfigError;
use crate::relocate::relocate;
use crate::resolve::resolve_tree;

/// The include `type` string handled natively by [`ConfigReader`].
pub const CONFIG_FILE_TYPE: &str = "StrataConfig";

/// Reader for one include `type`.
///
/// Implementations registered with
/// [`ConfigReader::register_include_reader`] receive every include entry
/// whose `type` matches their registration. The returned tree must
/// already be resolved and relocated, exactly as [`ConfigReader::read`]
/// returns its own.
pub trait IncludeReader {
    /// Read one included configuration file.
    fn read_include(
        &self,
        file_path: &Path,
        working_dir: &Path,
        source_node: &str,
        destination_node: &str,
    ) -> Result<ConfigNode, ConfigError>;
}

/// Reader for layered configuration files.
pub struct ConfigReader {
    reference_resolution_max_cycles: u32,
    include_readers: HashMap<String, Box<dyn IncludeReader>>,
}

impl Default for ConfigReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigReader {
    /// Create a reader with the default resolution budget of 100 cycles.
    pub fn new() -> Self {
        ConfigReader {
            reference_resolution_max_cycles: 100,
            include_readers: HashMap::new(),
        }
    }

    /// The maximum number of reference resolution cycles.
    pub fn reference_resolution_max_cycles(&self) -> u32 {
        self.reference_resolution_max_cycles
    }

    /// Set the maximum number of reference resolution cycles.
    ///
    /// # Panics
    ///
    /// Panics when `max_cycles` is zero.
    pub fn set_reference_resolution_max_cycles(&mut self, max_cycles: u32) {
        assert!(
            max_cycles > 0,
            "reference resolution max cycles must be greater than zero"
        );
        self.reference_resolution_max_cycles = max_cycles;
    }

    /// Register a reader for an additional include `type`.
    ///
    /// Returns false (without registering anything) when the type name
    /// is empty. Registering the same type again replaces the earlier
    /// reader. The built-in type is always handled by this reader
    /// itself.
    pub fn register_include_reader(
        &mut self,
        include_type: impl Into<String>,
        reader: Box<dyn IncludeReader>,
    ) -> bool {
        let include_type = include_type.into();
        if include_type.is_empty() {
            return false;
        }
        self.include_readers.insert(include_type, reader);
        true
    }

    /// Read a configuration file with source and destination `/`.
    pub fn read_root(
        &self,
        file_path: &Path,
        working_dir: &Path,
    ) -> Result<ConfigNode, ConfigError> {
        self.read(file_path, working_dir, ROOT_PATH, ROOT_PATH)
    }

    /// Read, assemble, resolve, and relocate a configuration file.
    ///
    /// `file_path` is resolved against `working_dir` when relative.
    /// `source_node` selects the sub-tree of the resolved configuration
    /// to return; `destination_node` is the node path the result is
    /// wrapped under. Both must be absolute node paths.
    pub fn read(
        &self,
        file_path: &Path,
        working_dir: &Path,
        source_node: &str,
        destination_node: &str,
    ) -> Result<ConfigNode, ConfigError> {
        let source = parse_absolute(source_node)
            .ok_or_else(|| ConfigError::InvalidSourceNode(source_node.to_string()))?;
        let destination = parse_absolute(destination_node)
            .ok_or_else(|| ConfigError::InvalidDestinationNode(destination_node.to_string()))?;

        let absolute_path = if file_path.is_absolute() {
            file_path.to_path_buf()
        } else {
            working_dir.join(file_path)
        };
        if !absolute_path.exists() {
            return Err(ConfigError::FileNotFound(absolute_path));
        }
        let absolute_path = absolute_path
            .canonicalize()
            .map_err(|source| ConfigError::FileOpen {
                path: absolute_path.clone(),
                source,
            })?;
        let contents =
            fs::read_to_string(&absolute_path).map_err(|source| ConfigError::FileOpen {
                path: absolute_path.clone(),
                source,
            })?;

        tracing::debug!(path = %absolute_path.display(), "reading configuration file");

        let document: Value = serde_json::from_str(&contents)
            .map_err(|error| json_parse_error(&absolute_path, &contents, &error))?;
        let Value::Object(root_object) = document else {
            return Err(schema_at_root(format!(
                "the root of `{}` is not a JSON object",
                absolute_path.display()
            )));
        };

        // Includes resolve their own relative paths against the
        // directory of the file that names them.
        let include_dir = absolute_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| working_dir.to_path_buf());

        let mut assembled = self.read_includes_member(&root_object, &include_dir)?;

        let config_member = read_config_member(&root_object)?;
        if !config_member.is_null() {
            // A `null` config contributes no overrides; anything else is
            // an object by now and overlays the included layers.
            if !assembled.apply_object(&config_member) {
                return Err(schema_at_root("failed to apply the `config` member"));
            }
        }

        resolve_tree(&mut assembled, self.reference_resolution_max_cycles)?;

        relocate(assembled, &source, &destination)
    }

    fn read_includes_member(
        &self,
        root_object: &Map<String, Value>,
        working_dir: &Path,
    ) -> Result<ConfigNode, ConfigError> {
        let entries = match root_object.get("includes") {
            None | Some(Value::Null) => return Ok(ConfigNode::object()),
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(schema_at_root("the `includes` member must be a JSON array"))
            }
        };

        let mut assembled = ConfigNode::object();
        for (index, entry) in entries.iter().enumerate() {
            let Value::Object(include) = entry else {
                return Err(schema_at_root(format!(
                    "include at index {index} is not a JSON object"
                )));
            };

            let include_type = match include.get("type") {
                None | Some(Value::Null) => CONFIG_FILE_TYPE,
                Some(Value::String(name)) => name.as_str(),
                Some(_) => {
                    return Err(schema_at_root(format!(
                        "the `type` member of include at index {index} must be a string"
                    )))
                }
            };
            let include_path = match include.get("file_path") {
                Some(Value::String(path)) => path,
                Some(_) => {
                    return Err(schema_at_root(format!(
                        "the `file_path` member of include at index {index} must be a string"
                    )))
                }
                None => {
                    return Err(schema_at_root(format!(
                        "include at index {index} is missing the `file_path` member"
                    )))
                }
            };
            let source_node = optional_string(include, "source_node", index)?.unwrap_or(ROOT_PATH);
            let destination_node =
                optional_string(include, "destination_node", index)?.unwrap_or(ROOT_PATH);

            tracing::debug!(
                index,
                path = %include_path,
                include_type,
                "reading include"
            );

            let included = if include_type == CONFIG_FILE_TYPE {
                self.read(
                    Path::new(include_path),
                    working_dir,
                    source_node,
                    destination_node,
                )
            } else if let Some(reader) = self.include_readers.get(include_type) {
                reader.read_include(
                    Path::new(include_path),
                    working_dir,
                    source_node,
                    destination_node,
                )
            } else {
                return Err(ConfigError::UnsupportedIncludeType {
                    include_type: include_type.to_string(),
                    index,
                });
            };
            let included = included.map_err(|error| ConfigError::Include {
                index,
                path: PathBuf::from(include_path),
                source: Box::new(error),
            })?;

            // Array order decides precedence: later includes override
            // earlier ones.
            if !assembled.apply_object(&included) {
                return Err(schema_at_root(format!(
                    "include at index {index} did not produce an Object configuration"
                )));
            }
        }

        Ok(assembled)
    }
}

fn parse_absolute(path: &str) -> Option<NodePath> {
    NodePath::parse(path).ok().filter(NodePath::is_absolute)
}

fn optional_string<'a>(
    include: &'a Map<String, Value>,
    member: &str,
    index: usize,
) -> Result<Option<&'a str>, ConfigError> {
    match include.get(member) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value)),
        Some(_) => Err(schema_at_root(format!(
            "the `{member}` member of include at index {index} must be a string"
        ))),
    }
}

fn read_config_member(root_object: &Map<String, Value>) -> Result<ConfigNode, ConfigError> {
    match root_object.get("config") {
        None | Some(Value::Null) => Ok(ConfigNode::Null),
        Some(Value::Object(members)) => convert::config_node_from_json(members, &NodePath::root()),
        Some(_) => Err(schema_at_root(
            "the `config` member must be a JSON object or null",
        )),
    }
}

fn schema_at_root(message: impl Into<String>) -> ConfigError {
    ConfigError::Schema {
        node_path: ROOT_PATH.to_string(),
        message: message.into(),
    }
}

fn json_parse_error(path: &Path, contents: &str, error: &serde_json::Error) -> ConfigError {
    const CONTEXT_MAX_LENGTH: usize = 20;

    let line = error.line();
    let column = error.column();
    let offset = byte_offset(contents, line, column);

    let bytes = contents.as_bytes();
    let at = offset.min(bytes.len());
    let start = at.saturating_sub(CONTEXT_MAX_LENGTH);
    let end = (at + CONTEXT_MAX_LENGTH).min(bytes.len());

    ConfigError::JsonParse {
        path: path.to_path_buf(),
        line,
        column,
        offset,
        message: error.to_string(),
        context_before: String::from_utf8_lossy(&bytes[start..at]).into_owned(),
        context_at: String::from_utf8_lossy(&bytes[at..end]).into_owned(),
    }
}

/// Byte offset of a 1-based line/column position.
fn byte_offset(contents: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (number, text) in contents.lines().enumerate() {
        if number + 1 == line {
            return offset + column.saturating_sub(1);
        }
        offset += text.len() + 1;
    }
    contents.len()
}
