//! # strata-config
//!
//! Layered JSON configuration files with includes, references, and
//! derived objects.
//!
//! A configuration file is not a tree literal: it *describes* a tree.
//! Files may include other files (with per-include source/destination
//! node paths), members may reference other nodes by path, and objects
//! may be derived from one or more base nodes with overrides. Reading a
//! configuration therefore runs a pipeline:
//!
//! 1. **Assemble**: load the root file, recursively read its includes,
//!    overlay each file's `config` member on top (later layers win);
//! 2. **Resolve**: iteratively rewrite `Reference`, `DerivedArray`, and
//!    `DerivedObject` nodes until only plain `Null`/`Value`/`Array`/
//!    `Object` nodes remain;
//! 3. **Relocate**: extract the requested source sub-tree and wrap it
//!    under the requested destination path.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use strata_config::ConfigReader;
//!
//! let reader = ConfigReader::new();
//! let config = reader
//!     .read_root(Path::new("app.json"), Path::new("."))
//!     .expect("configuration should resolve");
//!
//! if let Some(port) = config.member("port") {
//!     println!("port: {:?}", port.as_value());
//! }
//! ```
//!
//! The node tree itself (variants, node paths, the overlay operation)
//! lives in the `strata-node` crate and is re-exported here.

mod convert;
mod error;
mod reader;
mod relocate;
mod resolve;

pub use convert::config_node_from_json;
pub use error::ConfigError;
pub use reader::{ConfigReader, IncludeReader, CONFIG_FILE_TYPE};
pub use relocate::relocate;
pub use resolve::{resolve_tree, Resolution};

// Re-export the node model for convenience.
pub use strata_node::{
    is_absolute_node_path, is_valid_node_name, is_valid_node_path, ConfigNode, DerivedObjectNode,
    InvalidNodePath, NodeKind, NodePath, ROOT_PATH,
};
