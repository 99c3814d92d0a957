//! Links and jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MConfigList;

/// Who created and last touched an entity, and when
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditInfo {
    pub creation_user: String,
    pub creation_date: DateTime<Utc>,
    pub last_update_user: String,
    pub last_update_date: DateTime<Utc>,
}

impl AuditInfo {
    pub fn created_by(user: impl Into<String>) -> Self {
        let user = user.into();
        let now = Utc::now();
        Self {
            creation_user: user.clone(),
            creation_date: now,
            last_update_user: user,
            last_update_date: now,
        }
    }
}

/// Connection-level values bound to one connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MLink {
    pub persistence_id: Option<i64>,
    pub name: String,
    pub connector_name: String,
    pub enabled: bool,
    pub audit: AuditInfo,
    pub config: MConfigList,
}

impl MLink {
    /// New link populated from a clone of the connector's link schema
    pub fn new(
        name: impl Into<String>,
        connector_name: impl Into<String>,
        config: MConfigList,
        user: impl Into<String>,
    ) -> Self {
        Self {
            persistence_id: None,
            name: name.into(),
            connector_name: connector_name.into(),
            enabled: true,
            audit: AuditInfo::created_by(user),
            config,
        }
    }

    /// Same identity and audit trail, different config
    pub fn with_link_config(&self, config: MConfigList) -> Self {
        Self {
            config,
            ..self.clone()
        }
    }
}

/// A transfer between two links: FROM side, TO side and driver values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MJob {
    pub persistence_id: Option<i64>,
    pub name: String,
    pub from_link_id: i64,
    pub to_link_id: i64,
    pub from_connector: String,
    pub to_connector: String,
    pub enabled: bool,
    pub audit: AuditInfo,
    pub from_config: MConfigList,
    pub to_config: MConfigList,
    pub driver_config: MConfigList,
}

impl MJob {
    /// New job between two links. Unsaved links resolve to id 0, which no
    /// repository hands out.
    pub fn new(
        name: impl Into<String>,
        from: &MLink,
        to: &MLink,
        configs: (MConfigList, MConfigList, MConfigList),
        user: impl Into<String>,
    ) -> Self {
        let (from_config, to_config, driver_config) = configs;
        Self {
            persistence_id: None,
            name: name.into(),
            from_link_id: from.persistence_id.unwrap_or_default(),
            to_link_id: to.persistence_id.unwrap_or_default(),
            from_connector: from.connector_name.clone(),
            to_connector: to.connector_name.clone(),
            enabled: true,
            audit: AuditInfo::created_by(user),
            from_config,
            to_config,
            driver_config,
        }
    }

    /// Same identity and audit trail, different configs
    pub fn with_configs(
        &self,
        from_config: MConfigList,
        to_config: MConfigList,
        driver_config: MConfigList,
    ) -> Self {
        Self {
            from_config,
            to_config,
            driver_config,
            ..self.clone()
        }
    }

    pub fn uses_connector(&self, name: &str) -> bool {
        self.from_connector == name || self.to_connector == name
    }
}
