//! Test fixtures: connectors, upgraders and seeded repositories

use std::sync::Arc;

use ferry_common::model::{InputValue, MConfig, MConfigList, MConnector, MInput, MJob, MLink};
use ferry_common::validation::{InputCheck, InputValidator};
use ferry_connector::{ConfigurableUpgrader, Connector, CopyMatchingUpgrader, UpgraderRegistry};
use ferry_server::repository::{InMemoryRepository, Repository};
use ferry_server::upgrade::{Driver, NUM_EXTRACTORS, THROTTLING_CONFIG};

pub const TEST_CONNECTOR: &str = "test-connector";
pub const OTHER_CONNECTOR: &str = "other-connector";
pub const TEST_USER: &str = "test_user";

// ============================================================================
// Test Connector
// ============================================================================

/// Connector whose schema changed between version 1 and 2:
/// `linkConfig.url` became the required `linkConfig.connectionString`
pub struct TestConnector {
    name: String,
    version: String,
    link: MConfigList,
    from: Option<MConfigList>,
    to: Option<MConfigList>,
    upgraders: UpgraderRegistry,
}

impl TestConnector {
    pub fn v1(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1".to_string(),
            link: MConfigList::new(vec![MConfig::new(
                "linkConfig",
                vec![MInput::string("url", 100), MInput::string("user", 40)],
            )]),
            from: Some(table_config("fromJobConfig")),
            to: Some(table_config("toJobConfig")),
            upgraders: UpgraderRegistry::new(),
        }
    }

    pub fn v2(name: &str, upgraders: UpgraderRegistry) -> Self {
        let mut from = table_config("fromJobConfig");
        if let Some(config) = from.config_mut("fromJobConfig") {
            config.inputs.push(MInput::string("partitionColumn", 50));
        }
        Self {
            name: name.to_string(),
            version: "2".to_string(),
            link: MConfigList::new(vec![MConfig::new(
                "linkConfig",
                vec![
                    MInput::string("connectionString", 100).validator(InputValidator::error(InputCheck::NotEmpty)),
                    MInput::string("user", 40),
                ],
            )]),
            from: Some(from),
            to: Some(table_config("toJobConfig")),
            upgraders,
        }
    }
}

fn table_config(name: &str) -> MConfigList {
    MConfigList::new(vec![MConfig::new(
        name,
        vec![MInput::string("table", 50).validator(InputValidator::error(InputCheck::NotEmpty))],
    )])
}

impl Connector for TestConnector {
    fn unique_name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn link_config(&self) -> MConfigList {
        self.link.clone_schema()
    }

    fn from_job_config(&self) -> Option<MConfigList> {
        self.from.as_ref().map(MConfigList::clone_schema)
    }

    fn to_job_config(&self) -> Option<MConfigList> {
        self.to.as_ref().map(MConfigList::clone_schema)
    }

    fn upgraders(&self) -> &UpgraderRegistry {
        &self.upgraders
    }
}

// ============================================================================
// Driver
// ============================================================================

/// A version 2 driver whose `numExtractors` is capped at `max_extractors`
/// and which adds an optional `maxRetries` input
pub fn driver_v2(max_extractors: i64) -> Driver {
    let config = MConfigList::new(vec![MConfig::new(
        THROTTLING_CONFIG,
        vec![
            MInput::integer("numExtractors").validator(InputValidator::error(InputCheck::InRange {
                min: 1,
                max: max_extractors,
            })),
            MInput::integer("numLoaders"),
            MInput::integer("maxRetries"),
        ],
    )]);
    Driver::with_schema(
        "2",
        config,
        UpgraderRegistry::new().with_fallback(Arc::new(CopyMatchingUpgrader)),
    )
}

// ============================================================================
// Upgraders
// ============================================================================

/// Maps `linkConfig.url` onto `linkConfig.connectionString`
pub struct RenameUrlUpgrader;

impl ConfigurableUpgrader for RenameUrlUpgrader {
    fn upgrade_link_config(&self, original: &MConfigList, target: &mut MConfigList) -> anyhow::Result<()> {
        target.copy_matching_from(original);
        if let Some(url) = original.string_value("linkConfig.url") {
            target.set_value("linkConfig.connectionString", InputValue::from(url))?;
        }
        Ok(())
    }
}

/// Fails every link upgrade with the given error
pub struct FailingUpgrader<F>(pub F);

impl<F> ConfigurableUpgrader for FailingUpgrader<F>
where
    F: Fn() -> anyhow::Error + Send + Sync,
{
    fn upgrade_link_config(&self, _original: &MConfigList, _target: &mut MConfigList) -> anyhow::Result<()> {
        Err((self.0)())
    }
}

pub fn rename_url_registry() -> UpgraderRegistry {
    UpgraderRegistry::new().register("1", Arc::new(RenameUrlUpgrader))
}

// ============================================================================
// Seeding
// ============================================================================

/// Links and jobs stored against version 1 of the test connector
pub struct Seeded {
    pub connector: MConnector,
    pub source: MLink,
    pub target: MLink,
    pub other: MLink,
    /// test-connector → other-connector
    pub outbound: MJob,
    /// test-connector → test-connector
    pub internal: MJob,
}

pub fn link_values(connector: &TestConnector, url: Option<&str>) -> MConfigList {
    let mut config = connector.link_config();
    if let Some(url) = url {
        config.set_value("linkConfig.url", InputValue::from(url)).unwrap();
    }
    config.set_value("linkConfig.user", InputValue::from("sa")).unwrap();
    config
}

pub fn job_values(schema: Option<MConfigList>, config: &str, table: &str) -> MConfigList {
    let mut values = schema.unwrap();
    values.set_value(&format!("{config}.table"), InputValue::from(table)).unwrap();
    values
}

pub fn driver_values(extractors: i32) -> MConfigList {
    let mut values = Driver::new().config();
    values.set_value(NUM_EXTRACTORS, InputValue::from(extractors)).unwrap();
    values
}

/// Register version 1 of both test connectors plus the driver, and store
/// three links and two jobs. `target_url` is the url of the `target` link.
pub async fn seed(repository: &InMemoryRepository, target_url: Option<&str>) -> Seeded {
    let v1 = TestConnector::v1(TEST_CONNECTOR);
    let other = TestConnector::v1(OTHER_CONNECTOR);
    let connector = repository.register_connector(v1.to_model()).await.unwrap();
    repository.register_connector(other.to_model()).await.unwrap();
    repository.register_driver(Driver::new().to_model()).await.unwrap();

    let source = repository
        .create_link(MLink::new("source", TEST_CONNECTOR, link_values(&v1, Some("db://a")), TEST_USER))
        .await
        .unwrap();
    let target = repository
        .create_link(MLink::new("target", TEST_CONNECTOR, link_values(&v1, target_url), TEST_USER))
        .await
        .unwrap();
    let other_link = repository
        .create_link(MLink::new("warehouse", OTHER_CONNECTOR, link_values(&other, Some("db://w")), TEST_USER))
        .await
        .unwrap();

    let outbound = repository
        .create_job(MJob::new(
            "outbound",
            &source,
            &other_link,
            (
                job_values(v1.from_job_config(), "fromJobConfig", "employees"),
                job_values(other.to_job_config(), "toJobConfig", "staff"),
                driver_values(4),
            ),
            TEST_USER,
        ))
        .await
        .unwrap();
    let internal = repository
        .create_job(MJob::new(
            "internal",
            &source,
            &target,
            (
                job_values(v1.from_job_config(), "fromJobConfig", "orders"),
                job_values(v1.to_job_config(), "toJobConfig", "orders_copy"),
                driver_values(2),
            ),
            TEST_USER,
        ))
        .await
        .unwrap();

    Seeded {
        connector,
        source,
        target,
        other: other_link,
        outbound,
        internal,
    }
}
