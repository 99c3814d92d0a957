//! Server-specific error types

use ferry_common::validation::ConfigValidationResult;
use ferry_common::FerryError;
use ferry_connector::ConnectorError;
use thiserror::Error;

use crate::repository::RepositoryError;

/// Result type alias for upgrade operations
pub type UpgradeResult<T> = std::result::Result<T, UpgradeError>;

/// A link or job whose upgraded configs did not validate
#[derive(Debug, Clone)]
pub struct InvalidEntity {
    pub kind: &'static str,
    pub id: Option<i64>,
    pub name: String,
    pub validation: ConfigValidationResult,
}

#[derive(Error, Debug)]
pub enum UpgradeError {
    #[error("No upgrader registered for {configurable} version {version}")]
    MissingUpgrader { configurable: String, version: String },

    #[error("Upgrade of {configurable} rolled back: {} entities failed validation", invalid.len())]
    InvalidEntities {
        configurable: String,
        invalid: Vec<InvalidEntity>,
    },

    #[error("{name} is stored at version {stored} but version {current} is installed and auto-upgrade is disabled")]
    UpgradeRequired {
        name: String,
        stored: String,
        current: String,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Model(#[from] FerryError),

    /// Anything unexpected raised while upgrading, with its cause kept
    #[error("Upgrade failed while upgrading {context}")]
    Failed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl UpgradeError {
    /// Classify an error raised by upgrader code. Known failures pass
    /// through unchanged, anything else is wrapped.
    pub fn from_upgrader(error: anyhow::Error, context: impl Into<String>) -> Self {
        let error = match error.downcast::<RepositoryError>() {
            Ok(e) => return UpgradeError::Repository(e),
            Err(e) => e,
        };
        let error = match error.downcast::<UpgradeError>() {
            Ok(e) => return e,
            Err(e) => e,
        };
        match error.downcast::<FerryError>() {
            Ok(e) => UpgradeError::Model(e),
            Err(e) => UpgradeError::Failed {
                context: context.into(),
                source: e.into(),
            },
        }
    }
}

/// Errors from planning a job's partitions
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Connector {0} is not registered")]
    UnknownConnector(String),

    #[error("Connector {0} cannot partition its source")]
    NoPartitioner(String),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_repository_errors_pass_through() {
        let raised = anyhow::Error::new(RepositoryError::Storage("disk full".to_string()));
        let error = UpgradeError::from_upgrader(raised, "link source");
        assert!(matches!(error, UpgradeError::Repository(RepositoryError::Storage(_))));
    }

    #[test]
    fn test_typed_upgrade_errors_pass_through() {
        let raised = anyhow::Error::new(UpgradeError::MissingUpgrader {
            configurable: "c".to_string(),
            version: "0".to_string(),
        });
        let error = UpgradeError::from_upgrader(raised, "job copy");
        assert!(matches!(error, UpgradeError::MissingUpgrader { .. }));
    }

    #[test]
    fn test_unexpected_errors_are_wrapped_with_cause() {
        let raised = anyhow::anyhow!("field mapping exploded");
        let error = UpgradeError::from_upgrader(raised, "link source");
        assert!(matches!(error, UpgradeError::Failed { ref context, .. } if context == "link source"));
        assert_eq!(error.source().unwrap().to_string(), "field mapping exploded");
    }
}
