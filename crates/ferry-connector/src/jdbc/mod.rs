//! Generic JDBC connector
//!
//! Reads from and writes to any database reachable through a JDBC URL.
//! Only its schemas, upgraders and partitioner live here; the data path
//! belongs to the execution engine.

pub mod config;
mod partitioner;

use std::sync::Arc;

use ferry_common::model::MConfigList;

pub use partitioner::GenericJdbcPartitioner;

use crate::partition::Partitioner;
use crate::spi::Connector;
use crate::upgrade::{CopyMatchingUpgrader, UpgraderRegistry};

pub const CONNECTOR_NAME: &str = "generic-jdbc-connector";
pub const CONNECTOR_VERSION: &str = "2";

#[derive(Debug, Clone)]
pub struct GenericJdbcConnector {
    upgraders: UpgraderRegistry,
    partitioner: GenericJdbcPartitioner,
}

impl GenericJdbcConnector {
    pub fn new() -> Self {
        Self {
            upgraders: UpgraderRegistry::new().with_fallback(Arc::new(CopyMatchingUpgrader)),
            partitioner: GenericJdbcPartitioner,
        }
    }

    /// Replace the upgraders, e.g. to add a mapping for a renamed input
    pub fn with_upgraders(mut self, upgraders: UpgraderRegistry) -> Self {
        self.upgraders = upgraders;
        self
    }
}

impl Default for GenericJdbcConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for GenericJdbcConnector {
    fn unique_name(&self) -> &str {
        CONNECTOR_NAME
    }

    fn version(&self) -> &str {
        CONNECTOR_VERSION
    }

    fn link_config(&self) -> MConfigList {
        config::link_config()
    }

    fn from_job_config(&self) -> Option<MConfigList> {
        Some(config::from_job_config())
    }

    fn to_job_config(&self) -> Option<MConfigList> {
        Some(config::to_job_config())
    }

    fn upgraders(&self) -> &UpgraderRegistry {
        &self.upgraders
    }

    fn partitioner(&self) -> Option<&dyn Partitioner> {
        Some(&self.partitioner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ferry_common::model::Direction;

    #[test]
    fn test_model_supports_both_directions() {
        let connector = GenericJdbcConnector::new();
        let model = connector.to_model();
        assert_eq!(model.unique_name, CONNECTOR_NAME);
        assert_eq!(model.version, CONNECTOR_VERSION);
        assert!(model.persistence_id.is_none());
        assert_eq!(model.supported_directions(), vec![Direction::From, Direction::To]);
        assert!(model.job_config(Direction::From).unwrap().config("fromJobConfig").is_some());
    }

    #[test]
    fn test_any_earlier_version_has_an_upgrader() {
        let connector = GenericJdbcConnector::default();
        assert!(connector.upgraders().resolve("1").is_some());
        assert!(connector.partitioner().is_some());
    }
}
