//! Versioned configurables: connectors and the driver

use serde::{Deserialize, Serialize};

use super::{Direction, MConfigList};
use crate::error::{FerryError, Result};

/// Unique name the driver is registered under
pub const DRIVER_NAME: &str = "ferry-driver";

/// Stored description of a connector at one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MConnector {
    pub persistence_id: Option<i64>,
    pub unique_name: String,
    pub version: String,
    pub link_config: MConfigList,
    pub from_config: Option<MConfigList>,
    pub to_config: Option<MConfigList>,
}

impl MConnector {
    pub fn new(unique_name: impl Into<String>, version: impl Into<String>, link_config: MConfigList) -> Self {
        Self {
            persistence_id: None,
            unique_name: unique_name.into(),
            version: version.into(),
            link_config,
            from_config: None,
            to_config: None,
        }
    }

    pub fn with_from_config(mut self, config: MConfigList) -> Self {
        self.from_config = Some(config);
        self
    }

    pub fn with_to_config(mut self, config: MConfigList) -> Self {
        self.to_config = Some(config);
        self
    }

    /// Directions are derived from which job config schemas exist
    pub fn supported_directions(&self) -> Vec<Direction> {
        let mut directions = Vec::with_capacity(2);
        if self.from_config.is_some() {
            directions.push(Direction::From);
        }
        if self.to_config.is_some() {
            directions.push(Direction::To);
        }
        directions
    }

    pub fn supports(&self, direction: Direction) -> bool {
        self.job_config(direction).is_ok()
    }

    /// Job config schema for one side
    pub fn job_config(&self, direction: Direction) -> Result<&MConfigList> {
        let config = match direction {
            Direction::From => self.from_config.as_ref(),
            Direction::To => self.to_config.as_ref(),
        };
        config.ok_or_else(|| FerryError::DirectionNotSupported {
            connector: self.unique_name.clone(),
            direction,
        })
    }
}

/// Stored description of the driver at one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MDriver {
    pub persistence_id: Option<i64>,
    pub version: String,
    pub config: MConfigList,
}

impl MDriver {
    pub fn new(version: impl Into<String>, config: MConfigList) -> Self {
        Self {
            persistence_id: None,
            version: version.into(),
            config,
        }
    }

    pub fn unique_name(&self) -> &str {
        DRIVER_NAME
    }
}
