//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur while preparing or running a layout.
///
/// The iteration itself never fails on numeric grounds; degenerate inputs
/// (non-positive `K`, negative weights) propagate as NaN/Inf instead.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// The position store is not sized to the graph.
    #[error("position store has {actual} entries, graph has {expected} vertices")]
    PositionCountMismatch { expected: usize, actual: usize },

    /// A per-vertex or per-edge property store holds too few entries.
    #[error("{store} store has {actual} entries, graph needs {expected}")]
    StoreTooShort {
        store: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A layout parameter is outside its meaningful range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Parameter document could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] serde_json::Error),

    /// I/O error while reading a parameter file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
