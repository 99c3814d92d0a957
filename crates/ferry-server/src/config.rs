//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Stored connectors are not upgraded unless asked to.
pub const DEFAULT_CONNECTOR_AUTO_UPGRADE: bool = false;

/// The stored driver is not upgraded unless asked to.
pub const DEFAULT_DRIVER_AUTO_UPGRADE: bool = false;

/// Partitions requested for a job whose driver config does not set a count.
pub const DEFAULT_EXTRACTORS: u32 = 10;

/// Upper bound on the partitions any job may request.
pub const DEFAULT_MAX_EXTRACTORS: u32 = 1000;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub upgrade: UpgradeConfig,
    pub planning: PlanningConfig,
}

/// What to do when an installed connector or driver is newer than its
/// stored configs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    pub connector_auto_upgrade: bool,
    pub driver_auto_upgrade: bool,
}

/// Partition planning limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningConfig {
    pub default_extractors: u32,
    pub max_extractors: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upgrade: UpgradeConfig {
                connector_auto_upgrade: DEFAULT_CONNECTOR_AUTO_UPGRADE,
                driver_auto_upgrade: DEFAULT_DRIVER_AUTO_UPGRADE,
            },
            planning: PlanningConfig {
                default_extractors: DEFAULT_EXTRACTORS,
                max_extractors: DEFAULT_MAX_EXTRACTORS,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse().ok());
        let parsed_u32 = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u32>().ok());

        let config = Config {
            upgrade: UpgradeConfig {
                connector_auto_upgrade: parsed("FERRY_CONNECTOR_AUTO_UPGRADE")
                    .unwrap_or(DEFAULT_CONNECTOR_AUTO_UPGRADE),
                driver_auto_upgrade: parsed("FERRY_DRIVER_AUTO_UPGRADE").unwrap_or(DEFAULT_DRIVER_AUTO_UPGRADE),
            },
            planning: PlanningConfig {
                default_extractors: parsed_u32("FERRY_DEFAULT_EXTRACTORS").unwrap_or(DEFAULT_EXTRACTORS),
                max_extractors: parsed_u32("FERRY_MAX_EXTRACTORS").unwrap_or(DEFAULT_MAX_EXTRACTORS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.planning.default_extractors == 0 {
            anyhow::bail!("Default extractor count must be greater than 0");
        }

        if self.planning.max_extractors < self.planning.default_extractors {
            anyhow::bail!(
                "Max extractor count ({}) cannot be less than the default extractor count ({})",
                self.planning.max_extractors,
                self.planning.default_extractors
            );
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.upgrade.connector_auto_upgrade);
        assert_eq!(config.planning.default_extractors, 10);
    }

    #[test]
    fn test_environment_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("FERRY_CONNECTOR_AUTO_UPGRADE", "true"),
            ("FERRY_DEFAULT_EXTRACTORS", "4"),
            ("FERRY_MAX_EXTRACTORS", "not-a-number"),
        ]))
        .unwrap();
        assert!(config.upgrade.connector_auto_upgrade);
        assert!(!config.upgrade.driver_auto_upgrade);
        assert_eq!(config.planning.default_extractors, 4);
        assert_eq!(config.planning.max_extractors, DEFAULT_MAX_EXTRACTORS);
    }

    #[test]
    fn test_validate_rejects_inconsistent_limits() {
        assert!(Config::from_lookup(lookup(&[("FERRY_DEFAULT_EXTRACTORS", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[
            ("FERRY_DEFAULT_EXTRACTORS", "20"),
            ("FERRY_MAX_EXTRACTORS", "5"),
        ]))
        .is_err());
    }
}
