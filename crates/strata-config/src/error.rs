//! Error types for reading and resolving configurations.
//!
//! Every error is fatal to the `read` call that produced it; nothing is
//! partially returned. Errors from nested include reads propagate upward
//! wrapped in [`ConfigError::Include`] so the failing include's index and
//! file path stay visible at the top.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The requested source node path is malformed or not absolute.
    #[error("invalid source node path `{0}`")]
    InvalidSourceNode(String),

    /// The requested destination node path is malformed or not absolute.
    #[error("invalid destination node path `{0}`")]
    InvalidDestinationNode(String),

    /// The configuration file does not exist.
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The configuration file exists but could not be read.
    #[error("failed to open configuration file {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid JSON.
    #[error(
        "failed to parse {} as JSON: {message}\n    context before error: `{context_before}`\n    context at error: `{context_at}`",
        .path.display()
    )]
    JsonParse {
        path: PathBuf,
        /// 1-based line of the parse failure.
        line: usize,
        /// 1-based column of the parse failure.
        column: usize,
        /// Byte offset of the parse failure.
        offset: usize,
        message: String,
        /// Up to 20 bytes of input preceding the failure.
        context_before: String,
        /// Up to 20 bytes of input at the failure.
        context_at: String,
    },

    /// The document is well-formed JSON but violates the configuration
    /// format (wrong member types, bad decorators, duplicate or invalid
    /// names, missing or empty `base`, ...).
    #[error("{message} (at node path `{node_path}`)")]
    Schema { node_path: String, message: String },

    /// An include names a `type` with no registered reader.
    #[error("unsupported type `{include_type}` for include at index {index}")]
    UnsupportedIncludeType { include_type: String, index: usize },

    /// A nested include read failed.
    #[error("failed to read include at index {index} ({})", .path.display())]
    Include {
        index: usize,
        path: PathBuf,
        #[source]
        source: Box<ConfigError>,
    },

    /// The resolver exhausted its cycle budget without converging.
    #[error("could not fully resolve the configuration (reference resolution max cycles: {cycles})")]
    Unresolved { cycles: u32 },

    /// Structural failure during resolution.
    #[error("resolution failed at node path `{node_path}`: {message}")]
    Resolution { node_path: String, message: String },

    /// The relocation source path is valid but names no node in the
    /// resolved configuration.
    #[error("source node `{0}` does not exist in the resolved configuration")]
    SourceNodeNotFound(String),
}
