//! Error types for Splice.

use thiserror::Error;

use crate::time::RationalTime;

/// Main error type for Splice operations.
#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A track, layer, object or clip id that the timeline does not own.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation is not legal in the current state (open transaction,
    /// active edit, finished editing context...).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Clips of one layer overlap on a track whose layer has no auto-transition.
    #[error("Overlapping clips on track {track} (layer priority {layer_priority}) at {position}")]
    Overlap {
        track: String,
        layer_priority: u32,
        position: RationalTime,
    },

    #[error("Player error: {0}")]
    Player(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SpliceError {
    /// Shorthand for a `NotFound` error naming the kind of entity.
    pub fn not_found(kind: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{kind} {id}"))
    }
}

/// Result type alias for Splice operations.
pub type Result<T> = std::result::Result<T, SpliceError>;
