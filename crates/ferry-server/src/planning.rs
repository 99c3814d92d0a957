//! Planning the extraction partitions of one job run

use ferry_common::model::MJob;
use ferry_common::MutableContext;
use ferry_connector::{Partition, PartitionerContext};
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::PlanError;
use crate::upgrade::{ConnectorManager, NUM_EXTRACTORS};

/// Partition count for `job`: its `numExtractors` setting, or the
/// configured default, capped at the configured maximum
pub fn requested_partitions(job: &MJob, config: &Config) -> u32 {
    job.driver_config
        .integer_value(NUM_EXTRACTORS)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(config.planning.default_extractors)
        .min(config.planning.max_extractors)
}

/// Run the FROM connector's partitioner over the bounds in `context`
#[instrument(skip_all, fields(job = %job.name, connector = %job.from_connector, user = %user))]
pub fn plan_partitions(
    job: &MJob,
    connectors: &ConnectorManager,
    config: &Config,
    context: MutableContext,
    user: &str,
) -> Result<Vec<Partition>, PlanError> {
    let connector = connectors
        .connector(&job.from_connector)
        .ok_or_else(|| PlanError::UnknownConnector(job.from_connector.clone()))?;
    let partitioner = connector
        .partitioner()
        .ok_or_else(|| PlanError::NoPartitioner(job.from_connector.clone()))?;

    let requested = requested_partitions(job, config);
    let context = PartitionerContext::new(context, requested, user);
    let partitions = partitioner.get_partitions(&context, &job.from_config)?;
    debug!(requested, planned = partitions.len(), "Planned job partitions");
    Ok(partitions)
}
