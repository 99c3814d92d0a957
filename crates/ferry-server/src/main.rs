//! Ferry Server - Main entry point

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ferry_common::logging::{init_logging, LogConfig};
use ferry_common::MutableContext;
use ferry_connector::jdbc::config::{from_job_config, ALLOW_NULL_IN_PARTITION_COLUMN};
use ferry_connector::jdbc::{GenericJdbcConnector, GenericJdbcPartitioner};
use ferry_connector::partition::{
    PARTITION_COLUMN_NAME, PARTITION_COLUMN_TYPE, PARTITION_MAX_VALUE, PARTITION_MIN_VALUE,
};
use ferry_connector::{Partition, Partitioner, PartitionerContext};
use serde_json::json;
use tracing::info;

use ferry_server::config::Config;
use ferry_server::repository::InMemoryRepository;
use ferry_server::upgrade::{ConnectorManager, Driver};

/// Ferry - bulk transfer between JDBC databases and data stores
#[derive(Parser, Debug)]
#[command(name = "ferry-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute (defaults to bootstrap)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Upgrade stored connector configs when a newer connector is installed
    #[arg(long, global = true)]
    connector_auto_upgrade: bool,

    /// Upgrade stored driver configs when a newer driver is installed
    #[arg(long, global = true)]
    driver_auto_upgrade: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register the installed connectors and driver, upgrading stored configs as allowed
    Bootstrap,

    /// Print the partitions the generic JDBC connector plans for a column range
    Partition {
        /// Partition column name
        #[arg(long)]
        column: String,

        /// Column type: a java.sql.Types code or a SQL type name
        #[arg(long)]
        column_type: String,

        /// Minimum column value (epoch milliseconds for temporal columns)
        #[arg(long)]
        min: Option<String>,

        /// Maximum column value
        #[arg(long)]
        max: Option<String>,

        /// Requested number of partitions
        #[arg(long, default_value_t = 4)]
        count: u32,

        /// Add a partition for NULL values
        #[arg(long)]
        allow_null: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .log_file_prefix("ferry-server")
        .filter_directives("ferry_server=info,ferry_connector=info,ferry_common=warn")
        .build()
        .merge_env()?;
    let _guard = init_logging(&log_config)?;

    match cli.command.unwrap_or(Commands::Bootstrap) {
        Commands::Bootstrap => bootstrap(cli.connector_auto_upgrade, cli.driver_auto_upgrade).await,
        Commands::Partition {
            column,
            column_type,
            min,
            max,
            count,
            allow_null,
        } => print_partitions(&column, &column_type, min, max, count, allow_null),
    }
}

async fn bootstrap(connector_auto_upgrade: bool, driver_auto_upgrade: bool) -> Result<()> {
    info!("Starting Ferry Server");

    let mut config = Config::load()?;
    config.upgrade.connector_auto_upgrade |= connector_auto_upgrade;
    config.upgrade.driver_auto_upgrade |= driver_auto_upgrade;
    info!(
        connector_auto_upgrade = config.upgrade.connector_auto_upgrade,
        driver_auto_upgrade = config.upgrade.driver_auto_upgrade,
        default_extractors = config.planning.default_extractors,
        "Configuration loaded"
    );

    let repository = InMemoryRepository::new();
    let connectors = ConnectorManager::new().with_connector(Arc::new(GenericJdbcConnector::new()));
    let registered = connectors
        .register_all(&repository, config.upgrade.connector_auto_upgrade)
        .await
        .context("Failed to register connectors")?;
    for connector in &registered {
        info!(connector = %connector.unique_name, version = %connector.version, "Connector ready");
    }

    let driver = Driver::new()
        .register(&repository, config.upgrade.driver_auto_upgrade)
        .await
        .context("Failed to register driver")?;
    info!(version = %driver.version, "Driver ready");

    Ok(())
}

fn print_partitions(
    column: &str,
    column_type: &str,
    min: Option<String>,
    max: Option<String>,
    count: u32,
    allow_null: bool,
) -> Result<()> {
    let mut context = MutableContext::new();
    context.set_string(PARTITION_COLUMN_NAME, column);
    context.set_string(PARTITION_COLUMN_TYPE, column_type);
    if let Some(min) = min {
        context.set_string(PARTITION_MIN_VALUE, min);
    }
    if let Some(max) = max {
        context.set_string(PARTITION_MAX_VALUE, max);
    }

    let mut job_config = from_job_config();
    job_config.set_value(ALLOW_NULL_IN_PARTITION_COLUMN, allow_null.into())?;

    let context = PartitionerContext::new(context, count, "ferry-cli");
    let partitions = GenericJdbcPartitioner
        .get_partitions(&context, &job_config)
        .context("Failed to plan partitions")?;

    let rendered: Vec<_> = partitions
        .iter()
        .map(|p: &Partition| json!({ "conditions": p.conditions(), "partition": p }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}
