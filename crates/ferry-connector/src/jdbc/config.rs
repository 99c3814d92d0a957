//! Config schemas of the generic JDBC connector

use ferry_common::model::{MConfig, MConfigList, MInput};
use ferry_common::validation::{ConfigCheck, ConfigValidator, InputCheck, InputValidator};

/// Placeholder a free-form query must contain so partition conditions can
/// be substituted into it
pub const CONDITIONS_TOKEN: &str = "${CONDITIONS}";

pub const LINK_CONFIG: &str = "linkConfig";
pub const FROM_JOB_CONFIG: &str = "fromJobConfig";
pub const TO_JOB_CONFIG: &str = "toJobConfig";

/// Full name of the flag that adds an `IS NULL` partition
pub const ALLOW_NULL_IN_PARTITION_COLUMN: &str = "fromJobConfig.allowNullValueInPartitionColumn";
pub const PARTITION_COLUMN: &str = "fromJobConfig.partitionColumn";

fn table_or_sql() -> [ConfigValidator; 2] {
    let names = || vec!["tableName".to_string(), "sql".to_string()];
    [
        ConfigValidator::error(ConfigCheck::MutuallyExclusive(names())),
        ConfigValidator::error(ConfigCheck::AtLeastOneOf(names())),
    ]
}

fn sql_input() -> MInput {
    MInput::string("sql", 2000)
        .validator(InputValidator::error(InputCheck::NullOrContains(CONDITIONS_TOKEN.to_string())))
}

pub fn link_config() -> MConfigList {
    MConfigList::new(vec![MConfig::new(
        LINK_CONFIG,
        vec![
            MInput::string("jdbcDriver", 128).validator(InputValidator::error(InputCheck::NotEmpty)),
            MInput::string("connectionString", 2000)
                .validator(InputValidator::error(InputCheck::NotEmpty))
                .validator(InputValidator::warning(InputCheck::StartsWith("jdbc:".to_string()))),
            MInput::string("username", 40),
            MInput::string("password", 40).sensitive(),
            MInput::map("jdbcProperties"),
        ],
    )])
}

pub fn from_job_config() -> MConfigList {
    let [exclusive, required] = table_or_sql();
    MConfigList::new(vec![MConfig::new(
        FROM_JOB_CONFIG,
        vec![
            MInput::string("schemaName", 50),
            MInput::string("tableName", 50),
            sql_input(),
            MInput::string("columns", 50),
            MInput::string("partitionColumn", 50),
            MInput::boolean("allowNullValueInPartitionColumn"),
            MInput::string("boundaryQuery", 50),
        ],
    )
    .validator(exclusive)
    .validator(required)])
}

pub fn to_job_config() -> MConfigList {
    let [exclusive, required] = table_or_sql();
    MConfigList::new(vec![MConfig::new(
        TO_JOB_CONFIG,
        vec![
            MInput::string("schemaName", 50),
            MInput::string("tableName", 2000),
            sql_input(),
            MInput::string("columns", 50),
            MInput::string("stageTableName", 2000),
            MInput::boolean("shouldClearStageTable"),
        ],
    )
    .validator(exclusive)
    .validator(required)])
}
