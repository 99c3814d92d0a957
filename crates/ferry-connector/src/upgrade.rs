//! Per-version config upgraders
//!
//! When a connector or the driver ships a new config schema, every stored
//! link and job has to be re-keyed against it. An upgrader maps values from
//! the old populated configs onto an empty clone of the new schema.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ferry_common::model::MConfigList;
use tracing::debug;

/// Field-mapping logic between two schema versions.
///
/// Each method receives the old populated configs and an empty clone of the
/// new schema to fill in. The defaults copy every value whose config name,
/// input name and type survived.
pub trait ConfigurableUpgrader: Send + Sync {
    fn upgrade_link_config(&self, original: &MConfigList, target: &mut MConfigList) -> anyhow::Result<()> {
        copy_matching("link", original, target);
        Ok(())
    }

    fn upgrade_from_job_config(&self, original: &MConfigList, target: &mut MConfigList) -> anyhow::Result<()> {
        copy_matching("from job", original, target);
        Ok(())
    }

    fn upgrade_to_job_config(&self, original: &MConfigList, target: &mut MConfigList) -> anyhow::Result<()> {
        copy_matching("to job", original, target);
        Ok(())
    }

    /// Driver side of a job
    fn upgrade_job_config(&self, original: &MConfigList, target: &mut MConfigList) -> anyhow::Result<()> {
        copy_matching("driver", original, target);
        Ok(())
    }
}

fn copy_matching(kind: &str, original: &MConfigList, target: &mut MConfigList) {
    let copied = target.copy_matching_from(original);
    debug!(kind, copied, "Copied matching inputs");
}

/// Upgrader that only relies on the name-and-type copy
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyMatchingUpgrader;

impl ConfigurableUpgrader for CopyMatchingUpgrader {}

/// Upgraders keyed by the version they upgrade from
#[derive(Clone, Default)]
pub struct UpgraderRegistry {
    by_version: HashMap<String, Arc<dyn ConfigurableUpgrader>>,
    fallback: Option<Arc<dyn ConfigurableUpgrader>>,
}

impl UpgraderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upgrader used for configs stored at `from_version`
    pub fn register(mut self, from_version: impl Into<String>, upgrader: Arc<dyn ConfigurableUpgrader>) -> Self {
        self.by_version.insert(from_version.into(), upgrader);
        self
    }

    /// Upgrader used for any version without an explicit entry
    pub fn with_fallback(mut self, upgrader: Arc<dyn ConfigurableUpgrader>) -> Self {
        self.fallback = Some(upgrader);
        self
    }

    pub fn resolve(&self, from_version: &str) -> Option<Arc<dyn ConfigurableUpgrader>> {
        self.by_version
            .get(from_version)
            .or(self.fallback.as_ref())
            .cloned()
    }
}

impl fmt::Debug for UpgraderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut versions: Vec<&String> = self.by_version.keys().collect();
        versions.sort();
        f.debug_struct("UpgraderRegistry")
            .field("versions", &versions)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}
