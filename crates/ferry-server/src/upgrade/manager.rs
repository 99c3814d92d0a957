//! Installed connectors and the driver
//!
//! Both are plain handles built at startup and passed to whatever needs
//! them. Registering compares the installed version with the stored one
//! and upgrades the stored configs when they differ.

use std::collections::BTreeMap;
use std::sync::Arc;

use ferry_common::model::{MConfig, MConfigList, MConnector, MDriver, MInput};
use ferry_common::validation::{InputCheck, InputValidator};
use ferry_connector::{Connector, CopyMatchingUpgrader, UpgraderRegistry};
use tracing::{info, instrument};

use super::{upgrade_connector, upgrade_driver};
use crate::error::{UpgradeError, UpgradeResult};
use crate::repository::{Repository, RepositoryError};

pub const DRIVER_VERSION: &str = "1";

pub const THROTTLING_CONFIG: &str = "throttlingConfig";
/// Requested number of extraction partitions
pub const NUM_EXTRACTORS: &str = "throttlingConfig.numExtractors";
pub const NUM_LOADERS: &str = "throttlingConfig.numLoaders";

/// Connectors installed in this server, by unique name
#[derive(Clone, Default)]
pub struct ConnectorManager {
    connectors: BTreeMap<String, Arc<dyn Connector>>,
}

impl ConnectorManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a connector, replacing one with the same name
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connectors.insert(connector.unique_name().to_string(), connector);
        self
    }

    pub fn connector(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors.get(name).map(|c| &**c)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.connectors.keys().map(String::as_str)
    }

    /// Make the repository agree with the installed connectors.
    ///
    /// Unknown connectors are registered. A stored connector at another
    /// version is upgraded when `auto_upgrade` is set and rejected with
    /// [`UpgradeError::UpgradeRequired`] otherwise.
    #[instrument(skip_all, fields(connectors = self.connectors.len(), auto_upgrade = auto_upgrade))]
    pub async fn register_all<R: Repository>(
        &self,
        repository: &R,
        auto_upgrade: bool,
    ) -> UpgradeResult<Vec<MConnector>> {
        let mut registered = Vec::with_capacity(self.connectors.len());
        for connector in self.connectors.values() {
            let installed = connector.to_model();
            let stored = match repository.find_connector(&installed.unique_name).await? {
                None => {
                    info!(connector = %installed.unique_name, version = %installed.version, "Registering new connector");
                    repository.register_connector(installed).await?
                },
                Some(stored) if stored.version == installed.version => stored,
                Some(stored) if !auto_upgrade => {
                    return Err(UpgradeError::UpgradeRequired {
                        name: stored.unique_name,
                        stored: stored.version,
                        current: installed.version,
                    });
                },
                Some(stored) => {
                    upgrade_connector(repository, &stored, &installed, connector.upgraders()).await?;
                    repository
                        .find_connector(&installed.unique_name)
                        .await?
                        .ok_or_else(|| RepositoryError::not_found("connector", &installed.unique_name))?
                },
            };
            registered.push(stored);
        }
        Ok(registered)
    }
}

impl std::fmt::Debug for ConnectorManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorManager")
            .field("connectors", &self.connectors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The job driver: owns the driver config every job carries
#[derive(Debug, Clone)]
pub struct Driver {
    version: String,
    config: MConfigList,
    upgraders: UpgraderRegistry,
}

impl Driver {
    pub fn new() -> Self {
        Self {
            version: DRIVER_VERSION.to_string(),
            config: default_driver_config(),
            upgraders: UpgraderRegistry::new().with_fallback(Arc::new(CopyMatchingUpgrader)),
        }
    }

    /// A driver with a different schema, as installed by a newer release
    pub fn with_schema(version: impl Into<String>, config: MConfigList, upgraders: UpgraderRegistry) -> Self {
        Self {
            version: version.into(),
            config,
            upgraders,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Empty driver config for a new job
    pub fn config(&self) -> MConfigList {
        self.config.clone_schema()
    }

    pub fn upgraders(&self) -> &UpgraderRegistry {
        &self.upgraders
    }

    pub fn to_model(&self) -> MDriver {
        MDriver::new(self.version.clone(), self.config.clone_schema())
    }

    /// Same version policy as [`ConnectorManager::register_all`]
    #[instrument(skip_all, fields(version = %self.version, auto_upgrade = auto_upgrade))]
    pub async fn register<R: Repository>(&self, repository: &R, auto_upgrade: bool) -> UpgradeResult<MDriver> {
        let installed = self.to_model();
        match repository.find_driver().await? {
            None => {
                info!("Registering driver");
                Ok(repository.register_driver(installed).await?)
            },
            Some(stored) if stored.version == installed.version => Ok(stored),
            Some(stored) if !auto_upgrade => Err(UpgradeError::UpgradeRequired {
                name: installed.unique_name().to_string(),
                stored: stored.version,
                current: installed.version,
            }),
            Some(stored) => {
                upgrade_driver(repository, &installed, &stored.version, &self.upgraders).await?;
                Ok(repository
                    .find_driver()
                    .await?
                    .ok_or_else(|| RepositoryError::not_found("driver", installed.unique_name()))?)
            },
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

fn default_driver_config() -> MConfigList {
    let positive = || InputValidator::error(InputCheck::InRange {
        min: 1,
        max: i64::from(i32::MAX),
    });
    MConfigList::new(vec![MConfig::new(
        THROTTLING_CONFIG,
        vec![
            MInput::integer("numExtractors").validator(positive()),
            MInput::integer("numLoaders").validator(positive()),
        ],
    )])
}
