//! Connector error types

use ferry_common::FerryError;
use thiserror::Error;

/// Problems with the partitioning inputs, detected before any partition
/// is produced
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PartitionError {
    #[error("Partition column {column} has no type")]
    MissingColumnType { column: String },

    #[error("Unsupported partition column type: {0}")]
    UnsupportedType(String),

    #[error("Partition column {column} has a {present} value but no {missing} value")]
    MissingBound {
        column: String,
        present: &'static str,
        missing: &'static str,
    },

    #[error("Invalid {which} value '{value}' for {column_type} column {column}: {reason}")]
    InvalidBound {
        column: String,
        column_type: String,
        which: &'static str,
        value: String,
        reason: String,
    },

    #[error("Minimum value '{min}' of column {column} is greater than maximum value '{max}'")]
    InvertedBounds {
        column: String,
        min: String,
        max: String,
    },
}

impl PartitionError {
    /// Every partition error stems from bad initialization data
    pub fn is_initialization_error(&self) -> bool {
        true
    }
}

/// Error type for connector operations
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Model(#[from] FerryError),
}

impl ConnectorError {
    pub fn is_initialization_error(&self) -> bool {
        matches!(self, ConnectorError::Partition(e) if e.is_initialization_error())
    }
}
