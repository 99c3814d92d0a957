//! Migrating stored configs to a new connector or driver version
//!
//! An upgrade replaces the stored schema and re-keys every dependent link
//! and job inside one repository transaction:
//!
//! 1. resolve the upgrader registered for the stored version
//! 2. fetch the dependents
//! 3. delete their stored input values and write the new schema
//! 4. map each dependent's old values onto an empty clone of the new
//!    schema, validate, and stage the update
//! 5. commit when every dependent validated, roll back otherwise
//!
//! Validation failures are collected across all dependents before the
//! rollback so they can be reported together. The transaction is closed
//! whatever the outcome.

mod manager;

use ferry_common::model::{Direction, MConnector, MDriver, MJob, MLink};
use ferry_common::validation::{validate_configs, ConfigValidationResult};
use ferry_connector::{ConfigurableUpgrader, UpgraderRegistry};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{InvalidEntity, UpgradeError, UpgradeResult};
use crate::repository::{Repository, RepositoryError, RepositoryTransaction};

pub use manager::{ConnectorManager, Driver, DRIVER_VERSION, NUM_EXTRACTORS, NUM_LOADERS, THROTTLING_CONFIG};

/// How many dependents an upgrade rewrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    pub links: usize,
    pub jobs: usize,
}

/// Upgrade a stored connector and every link and job that uses it
#[instrument(skip_all, fields(connector = %old.unique_name, from = %old.version, to = %new.version))]
pub async fn upgrade_connector<R: Repository>(
    repository: &R,
    old: &MConnector,
    new: &MConnector,
    upgraders: &UpgraderRegistry,
) -> UpgradeResult<UpgradeReport> {
    let upgrader = upgraders
        .resolve(&old.version)
        .ok_or_else(|| UpgradeError::MissingUpgrader {
            configurable: old.unique_name.clone(),
            version: old.version.clone(),
        })?;

    let links = repository.find_links_for_connector(&old.unique_name).await?;
    let jobs = repository.find_jobs_for_connector(&old.unique_name).await?;
    info!(links = links.len(), jobs = jobs.len(), "Upgrading connector configs");

    let mut tx = repository.transaction();
    let outcome = stage_connector_upgrade(repository, &mut tx, upgrader.as_ref(), new, &links, &jobs).await;
    finish(&mut tx, outcome, &old.unique_name).await?;

    info!("Connector upgrade committed");
    Ok(UpgradeReport {
        links: links.len(),
        jobs: jobs.len(),
    })
}

/// Upgrade the stored driver and the driver configs of every job
#[instrument(skip_all, fields(from = %old_version, to = %new.version))]
pub async fn upgrade_driver<R: Repository>(
    repository: &R,
    new: &MDriver,
    old_version: &str,
    upgraders: &UpgraderRegistry,
) -> UpgradeResult<UpgradeReport> {
    let upgrader = upgraders
        .resolve(old_version)
        .ok_or_else(|| UpgradeError::MissingUpgrader {
            configurable: new.unique_name().to_string(),
            version: old_version.to_string(),
        })?;

    let jobs = repository.find_jobs().await?;
    info!(jobs = jobs.len(), "Upgrading driver configs");

    let mut tx = repository.transaction();
    let outcome = stage_driver_upgrade(repository, &mut tx, upgrader.as_ref(), new, &jobs).await;
    finish(&mut tx, outcome, new.unique_name()).await?;

    info!("Driver upgrade committed");
    Ok(UpgradeReport {
        links: 0,
        jobs: jobs.len(),
    })
}

async fn stage_connector_upgrade<R: Repository>(
    repository: &R,
    tx: &mut R::Transaction,
    upgrader: &dyn ConfigurableUpgrader,
    new: &MConnector,
    links: &[MLink],
    jobs: &[MJob],
) -> UpgradeResult<()> {
    tx.begin().await?;

    for link in links {
        repository.delete_link_inputs(link_id(link)?, tx).await?;
    }
    for job in jobs {
        repository.delete_job_inputs(job_id(job)?, tx).await?;
    }
    repository.upgrade_connector_and_configs(new, tx).await?;

    let mut invalid = Vec::new();
    for link in links {
        let mut config = new.link_config.clone_schema();
        upgrader
            .upgrade_link_config(&link.config, &mut config)
            .map_err(|e| UpgradeError::from_upgrader(e, format!("link {}", link.name)))?;
        let upgraded = link.with_link_config(config);
        let validation = validate_configs(&upgraded.config);
        if validation.can_proceed() {
            repository.update_link(&upgraded, tx).await?;
        } else {
            invalid.push(InvalidEntity {
                kind: "link",
                id: upgraded.persistence_id,
                name: upgraded.name,
                validation,
            });
        }
    }

    for job in jobs {
        let (upgraded, validation) = upgrade_job_sides(upgrader, job, new)?;
        if validation.can_proceed() {
            repository.update_job(&upgraded, tx).await?;
        } else {
            invalid.push(InvalidEntity {
                kind: "job",
                id: upgraded.persistence_id,
                name: upgraded.name,
                validation,
            });
        }
    }

    reject_invalid(&new.unique_name, invalid)
}

/// Upgrade the sides of `job` that use `new`, leaving the other side as is
fn upgrade_job_sides(
    upgrader: &dyn ConfigurableUpgrader,
    job: &MJob,
    new: &MConnector,
) -> UpgradeResult<(MJob, ConfigValidationResult)> {
    let mut validation = ConfigValidationResult::new();
    let mut from_config = job.from_config.clone();
    let mut to_config = job.to_config.clone();

    if job.from_connector == new.unique_name {
        let mut target = new.job_config(Direction::From)?.clone_schema();
        upgrader
            .upgrade_from_job_config(&job.from_config, &mut target)
            .map_err(|e| UpgradeError::from_upgrader(e, format!("FROM side of job {}", job.name)))?;
        validation.merge(validate_configs(&target));
        from_config = target;
    }
    if job.to_connector == new.unique_name {
        let mut target = new.job_config(Direction::To)?.clone_schema();
        upgrader
            .upgrade_to_job_config(&job.to_config, &mut target)
            .map_err(|e| UpgradeError::from_upgrader(e, format!("TO side of job {}", job.name)))?;
        validation.merge(validate_configs(&target));
        to_config = target;
    }

    let upgraded = job.with_configs(from_config, to_config, job.driver_config.clone());
    Ok((upgraded, validation))
}

async fn stage_driver_upgrade<R: Repository>(
    repository: &R,
    tx: &mut R::Transaction,
    upgrader: &dyn ConfigurableUpgrader,
    new: &MDriver,
    jobs: &[MJob],
) -> UpgradeResult<()> {
    tx.begin().await?;

    for job in jobs {
        repository.delete_job_inputs(job_id(job)?, tx).await?;
    }
    repository.upgrade_driver_and_configs(new, tx).await?;

    let mut invalid = Vec::new();
    for job in jobs {
        let mut driver_config = new.config.clone_schema();
        upgrader
            .upgrade_job_config(&job.driver_config, &mut driver_config)
            .map_err(|e| UpgradeError::from_upgrader(e, format!("driver config of job {}", job.name)))?;
        let validation = validate_configs(&driver_config);
        let upgraded = job.with_configs(job.from_config.clone(), job.to_config.clone(), driver_config);
        if validation.can_proceed() {
            repository.update_job(&upgraded, tx).await?;
        } else {
            invalid.push(InvalidEntity {
                kind: "job",
                id: upgraded.persistence_id,
                name: upgraded.name,
                validation,
            });
        }
    }

    reject_invalid(new.unique_name(), invalid)
}

fn link_id(link: &MLink) -> Result<i64, RepositoryError> {
    link.persistence_id
        .ok_or_else(|| RepositoryError::not_found("link", &link.name))
}

fn job_id(job: &MJob) -> Result<i64, RepositoryError> {
    job.persistence_id
        .ok_or_else(|| RepositoryError::not_found("job", &job.name))
}

/// Log every invalid entity, then fail if there was any
fn reject_invalid(configurable: &str, invalid: Vec<InvalidEntity>) -> UpgradeResult<()> {
    if invalid.is_empty() {
        return Ok(());
    }
    for entity in &invalid {
        for (key, messages) in entity.validation.messages() {
            let messages: Vec<String> = messages.iter().map(ToString::to_string).collect();
            error!(
                kind = entity.kind,
                id = ?entity.id,
                name = %entity.name,
                config = key,
                messages = %messages.join("; "),
                "Upgraded entity failed validation"
            );
        }
    }
    Err(UpgradeError::InvalidEntities {
        configurable: configurable.to_string(),
        invalid,
    })
}

/// Commit a successful upgrade, roll back a failed one, close either way
async fn finish<T: RepositoryTransaction>(
    tx: &mut T,
    outcome: UpgradeResult<()>,
    configurable: &str,
) -> UpgradeResult<()> {
    let result = match outcome {
        Ok(()) => match tx.commit().await {
            Ok(()) => Ok(()),
            Err(e) => {
                rollback(tx, configurable).await;
                Err(e.into())
            },
        },
        Err(e) => {
            rollback(tx, configurable).await;
            Err(e)
        },
    };

    if let Err(e) = tx.close().await {
        warn!(tx = %tx.id(), error = %e, "Failed to close upgrade transaction");
    }
    result
}

async fn rollback<T: RepositoryTransaction>(tx: &mut T, configurable: &str) {
    if !tx.is_active() {
        debug!(tx = %tx.id(), state = %tx.state(), "Nothing to roll back");
        return;
    }
    match tx.rollback().await {
        Ok(()) => info!(configurable, tx = %tx.id(), "Upgrade rolled back"),
        Err(e) => warn!(configurable, tx = %tx.id(), error = %e, "Rollback of upgrade transaction failed"),
    }
}
