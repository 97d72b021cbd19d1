//! Error types for the AI system

use thiserror::Error;

use crate::grid::NodeId;

/// AI system errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AiError {
    /// Direction index outside the table
    #[error("Direction index {index} out of range (table has {count} entries)")]
    DirectionOutOfRange { index: usize, count: usize },

    /// A direction table needs at least one entry
    #[error("Direction table must contain at least one direction")]
    EmptyDirectionTable,

    /// Node id not present in the navigation grid
    #[error("Unknown navigation node: {0:?}")]
    UnknownNode(NodeId),

    /// Invalid configuration
    #[error("Invalid AI configuration: {0}")]
    InvalidConfig(String),
}

impl AiError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for AI operations
pub type Result<T> = std::result::Result<T, AiError>;
