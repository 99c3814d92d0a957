//! What a connector exposes to the server

use ferry_common::model::{MConnector, MConfigList};

use crate::partition::Partitioner;
use crate::upgrade::UpgraderRegistry;

/// A pluggable connector: its config schemas, upgraders and partitioner
pub trait Connector: Send + Sync {
    fn unique_name(&self) -> &str;

    fn version(&self) -> &str;

    fn link_config(&self) -> MConfigList;

    /// `None` when the connector cannot be read from
    fn from_job_config(&self) -> Option<MConfigList>;

    /// `None` when the connector cannot be written to
    fn to_job_config(&self) -> Option<MConfigList>;

    /// Upgraders for configs stored by earlier versions
    fn upgraders(&self) -> &UpgraderRegistry;

    fn partitioner(&self) -> Option<&dyn Partitioner> {
        None
    }

    /// The stored description of this connector version
    fn to_model(&self) -> MConnector {
        MConnector {
            persistence_id: None,
            unique_name: self.unique_name().to_string(),
            version: self.version().to_string(),
            link_config: self.link_config(),
            from_config: self.from_job_config(),
            to_config: self.to_job_config(),
        }
    }
}
