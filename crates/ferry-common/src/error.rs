//! Error types for the Ferry model

use thiserror::Error;

use crate::model::{Direction, InputType};

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, FerryError>;

/// Main error type for the shared model
#[derive(Error, Debug)]
pub enum FerryError {
    #[error("Invalid input name '{0}': expected <config>.<input>")]
    InvalidInputName(String),

    #[error("Config not found: {0}")]
    ConfigNotFound(String),

    #[error("Input not found: {0}")]
    InputNotFound(String),

    #[error("Input {input} expects a {expected} value, got {actual}")]
    InputTypeMismatch {
        input: String,
        expected: InputType,
        actual: InputType,
    },

    #[error("Cannot read '{value}' as a value for input {input}: {reason}")]
    InvalidValue {
        input: String,
        value: String,
        reason: String,
    },

    #[error("Input {input} does not allow value '{value}'")]
    InvalidEnumValue { input: String, value: String },

    #[error("Connector {connector} does not support the {direction} direction")]
    DirectionNotSupported {
        connector: String,
        direction: Direction,
    },
}
