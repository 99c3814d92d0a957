//! In-process repository
//!
//! All state lives behind one `RwLock`. Transactions record their writes in
//! an operation log; commit replays the log onto a copy of the store and
//! swaps it in under a single write lock, so readers see either none or all
//! of a transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use ferry_common::model::{MConnector, MDriver, MJob, MLink, DRIVER_NAME};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Repository, RepositoryError, RepositoryResult, RepositoryTransaction, TransactionState};

#[derive(Debug, Clone, Default)]
struct Store {
    connectors: BTreeMap<String, MConnector>,
    driver: Option<MDriver>,
    links: BTreeMap<i64, MLink>,
    jobs: BTreeMap<i64, MJob>,
    next_id: i64,
}

impl Store {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn link_mut(&mut self, id: i64) -> RepositoryResult<&mut MLink> {
        self.links.get_mut(&id).ok_or_else(|| RepositoryError::not_found("link", id))
    }

    fn job_mut(&mut self, id: i64) -> RepositoryResult<&mut MJob> {
        self.jobs.get_mut(&id).ok_or_else(|| RepositoryError::not_found("job", id))
    }

    /// Whether `write` would apply to the current state
    fn check(&self, write: &StagedWrite) -> RepositoryResult<()> {
        let link_exists = |id: i64| {
            self.links
                .contains_key(&id)
                .then_some(())
                .ok_or_else(|| RepositoryError::not_found("link", id))
        };
        let job_exists = |id: i64| {
            self.jobs
                .contains_key(&id)
                .then_some(())
                .ok_or_else(|| RepositoryError::not_found("job", id))
        };
        match write {
            StagedWrite::DeleteLinkInputs(id) => link_exists(*id),
            StagedWrite::DeleteJobInputs(id) => job_exists(*id),
            StagedWrite::UpdateLink(link) => link_exists(persisted_id("link", link.persistence_id, &link.name)?),
            StagedWrite::UpdateJob(job) => job_exists(persisted_id("job", job.persistence_id, &job.name)?),
            StagedWrite::ReplaceConnector(connector) => {
                if self.connectors.contains_key(&connector.unique_name) {
                    Ok(())
                } else {
                    Err(RepositoryError::not_found("connector", &connector.unique_name))
                }
            },
            StagedWrite::ReplaceDriver(_) => match self.driver {
                Some(_) => Ok(()),
                None => Err(RepositoryError::not_found("driver", DRIVER_NAME)),
            },
        }
    }

    fn apply(&mut self, write: StagedWrite) -> RepositoryResult<()> {
        match write {
            StagedWrite::DeleteLinkInputs(id) => self.link_mut(id)?.config.clear_values(),
            StagedWrite::DeleteJobInputs(id) => {
                let job = self.job_mut(id)?;
                job.from_config.clear_values();
                job.to_config.clear_values();
                job.driver_config.clear_values();
            },
            StagedWrite::ReplaceConnector(mut connector) => {
                let stored = self
                    .connectors
                    .get_mut(&connector.unique_name)
                    .ok_or_else(|| RepositoryError::not_found("connector", &connector.unique_name))?;
                connector.persistence_id = stored.persistence_id;
                *stored = connector;
            },
            StagedWrite::ReplaceDriver(mut driver) => {
                let stored = self
                    .driver
                    .as_mut()
                    .ok_or_else(|| RepositoryError::not_found("driver", DRIVER_NAME))?;
                driver.persistence_id = stored.persistence_id;
                *stored = driver;
            },
            StagedWrite::UpdateLink(link) => {
                let id = persisted_id("link", link.persistence_id, &link.name)?;
                *self.link_mut(id)? = link;
            },
            StagedWrite::UpdateJob(job) => {
                let id = persisted_id("job", job.persistence_id, &job.name)?;
                *self.job_mut(id)? = job;
            },
        }
        Ok(())
    }
}

fn persisted_id(kind: &'static str, id: Option<i64>, name: &str) -> RepositoryResult<i64> {
    id.ok_or_else(|| RepositoryError::not_found(kind, format!("{name} (never saved)")))
}

#[derive(Debug, Clone)]
enum StagedWrite {
    DeleteLinkInputs(i64),
    DeleteJobInputs(i64),
    ReplaceConnector(MConnector),
    ReplaceDriver(MDriver),
    UpdateLink(MLink),
    UpdateJob(MJob),
}

/// Transaction over an [`InMemoryRepository`]
#[derive(Debug)]
pub struct InMemoryTransaction {
    id: Uuid,
    state: TransactionState,
    store: Arc<RwLock<Store>>,
    staged: Vec<StagedWrite>,
}

impl InMemoryTransaction {
    fn ensure_active(&self) -> RepositoryResult<()> {
        if self.state == TransactionState::Active {
            Ok(())
        } else {
            Err(RepositoryError::TransactionNotActive {
                id: self.id,
                state: self.state,
            })
        }
    }

    /// Number of writes waiting for commit
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }
}

#[async_trait]
impl RepositoryTransaction for InMemoryTransaction {
    fn id(&self) -> Uuid {
        self.id
    }

    fn state(&self) -> TransactionState {
        self.state
    }

    async fn begin(&mut self) -> RepositoryResult<()> {
        if self.state != TransactionState::Created {
            return Err(RepositoryError::TransactionAlreadyStarted { id: self.id });
        }
        self.state = TransactionState::Active;
        debug!(tx = %self.id, "Transaction started");
        Ok(())
    }

    async fn commit(&mut self) -> RepositoryResult<()> {
        self.ensure_active()?;
        let mut guard = self.store.write().await;
        let mut next = guard.clone();
        for write in self.staged.iter().cloned() {
            next.apply(write)?;
        }
        *guard = next;
        drop(guard);

        debug!(tx = %self.id, writes = self.staged.len(), "Transaction committed");
        self.staged.clear();
        self.state = TransactionState::Committed;
        Ok(())
    }

    async fn rollback(&mut self) -> RepositoryResult<()> {
        self.ensure_active()?;
        debug!(tx = %self.id, discarded = self.staged.len(), "Transaction rolled back");
        self.staged.clear();
        self.state = TransactionState::RolledBack;
        Ok(())
    }

    async fn close(&mut self) -> RepositoryResult<()> {
        match self.state {
            TransactionState::Closed => return Ok(()),
            TransactionState::Active => {
                warn!(tx = %self.id, discarded = self.staged.len(), "Closing an active transaction, discarding writes");
                self.staged.clear();
            },
            _ => {},
        }
        self.state = TransactionState::Closed;
        Ok(())
    }
}

/// Repository kept entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a transaction may stage a write here
    fn check_transaction(&self, tx: &InMemoryTransaction) -> RepositoryResult<()> {
        tx.ensure_active()?;
        if !Arc::ptr_eq(&self.store, &tx.store) {
            return Err(RepositoryError::Storage(format!(
                "transaction {} belongs to another repository",
                tx.id
            )));
        }
        Ok(())
    }

    async fn stage(&self, tx: &mut InMemoryTransaction, write: StagedWrite) -> RepositoryResult<()> {
        self.check_transaction(tx)?;
        self.store.read().await.check(&write)?;
        tx.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    type Transaction = InMemoryTransaction;

    fn transaction(&self) -> InMemoryTransaction {
        InMemoryTransaction {
            id: Uuid::new_v4(),
            state: TransactionState::Created,
            store: Arc::clone(&self.store),
            staged: Vec::new(),
        }
    }

    async fn register_connector(&self, mut connector: MConnector) -> RepositoryResult<MConnector> {
        let mut store = self.store.write().await;
        if store.connectors.contains_key(&connector.unique_name) {
            return Err(RepositoryError::Duplicate {
                kind: "connector",
                key: connector.unique_name,
            });
        }
        connector.persistence_id = Some(store.allocate_id());
        store.connectors.insert(connector.unique_name.clone(), connector.clone());
        debug!(connector = %connector.unique_name, version = %connector.version, "Registered connector");
        Ok(connector)
    }

    async fn find_connector(&self, name: &str) -> RepositoryResult<Option<MConnector>> {
        Ok(self.store.read().await.connectors.get(name).cloned())
    }

    async fn register_driver(&self, mut driver: MDriver) -> RepositoryResult<MDriver> {
        let mut store = self.store.write().await;
        if store.driver.is_some() {
            return Err(RepositoryError::Duplicate {
                kind: "driver",
                key: driver.unique_name().to_string(),
            });
        }
        driver.persistence_id = Some(store.allocate_id());
        store.driver = Some(driver.clone());
        debug!(version = %driver.version, "Registered driver");
        Ok(driver)
    }

    async fn find_driver(&self) -> RepositoryResult<Option<MDriver>> {
        Ok(self.store.read().await.driver.clone())
    }

    async fn create_link(&self, mut link: MLink) -> RepositoryResult<MLink> {
        let mut store = self.store.write().await;
        if !store.connectors.contains_key(&link.connector_name) {
            return Err(RepositoryError::not_found("connector", &link.connector_name));
        }
        if store.links.values().any(|l| l.name == link.name) {
            return Err(RepositoryError::Duplicate {
                kind: "link",
                key: link.name,
            });
        }
        let id = store.allocate_id();
        link.persistence_id = Some(id);
        store.links.insert(id, link.clone());
        Ok(link)
    }

    async fn find_link(&self, id: i64) -> RepositoryResult<MLink> {
        self.store
            .read()
            .await
            .links
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("link", id))
    }

    async fn find_links(&self) -> RepositoryResult<Vec<MLink>> {
        Ok(self.store.read().await.links.values().cloned().collect())
    }

    async fn find_links_for_connector(&self, connector: &str) -> RepositoryResult<Vec<MLink>> {
        Ok(self
            .store
            .read()
            .await
            .links
            .values()
            .filter(|l| l.connector_name == connector)
            .cloned()
            .collect())
    }

    async fn enable_link(&self, id: i64, enabled: bool) -> RepositoryResult<()> {
        self.store.write().await.link_mut(id)?.enabled = enabled;
        Ok(())
    }

    async fn delete_link(&self, id: i64) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        let users: Vec<&str> = store
            .jobs
            .values()
            .filter(|j| j.from_link_id == id || j.to_link_id == id)
            .map(|j| j.name.as_str())
            .collect();
        if !users.is_empty() {
            return Err(RepositoryError::InUse {
                kind: "link",
                key: id.to_string(),
                used_by: users.join(", "),
            });
        }
        store
            .links
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found("link", id))
    }

    async fn create_job(&self, mut job: MJob) -> RepositoryResult<MJob> {
        let mut store = self.store.write().await;
        let from = store
            .links
            .get(&job.from_link_id)
            .ok_or_else(|| RepositoryError::not_found("link", job.from_link_id))?;
        let to = store
            .links
            .get(&job.to_link_id)
            .ok_or_else(|| RepositoryError::not_found("link", job.to_link_id))?;
        job.from_connector = from.connector_name.clone();
        job.to_connector = to.connector_name.clone();
        if store.jobs.values().any(|j| j.name == job.name) {
            return Err(RepositoryError::Duplicate {
                kind: "job",
                key: job.name,
            });
        }
        let id = store.allocate_id();
        job.persistence_id = Some(id);
        store.jobs.insert(id, job.clone());
        Ok(job)
    }

    async fn find_job(&self, id: i64) -> RepositoryResult<MJob> {
        self.store
            .read()
            .await
            .jobs
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found("job", id))
    }

    async fn find_jobs(&self) -> RepositoryResult<Vec<MJob>> {
        Ok(self.store.read().await.jobs.values().cloned().collect())
    }

    async fn find_jobs_for_connector(&self, connector: &str) -> RepositoryResult<Vec<MJob>> {
        Ok(self
            .store
            .read()
            .await
            .jobs
            .values()
            .filter(|j| j.uses_connector(connector))
            .cloned()
            .collect())
    }

    async fn enable_job(&self, id: i64, enabled: bool) -> RepositoryResult<()> {
        self.store.write().await.job_mut(id)?.enabled = enabled;
        Ok(())
    }

    async fn delete_job(&self, id: i64) -> RepositoryResult<()> {
        self.store
            .write()
            .await
            .jobs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found("job", id))
    }

    async fn delete_link_inputs(&self, link_id: i64, tx: &mut InMemoryTransaction) -> RepositoryResult<()> {
        self.stage(tx, StagedWrite::DeleteLinkInputs(link_id)).await
    }

    async fn delete_job_inputs(&self, job_id: i64, tx: &mut InMemoryTransaction) -> RepositoryResult<()> {
        self.stage(tx, StagedWrite::DeleteJobInputs(job_id)).await
    }

    async fn upgrade_connector_and_configs(
        &self,
        connector: &MConnector,
        tx: &mut InMemoryTransaction,
    ) -> RepositoryResult<()> {
        self.stage(tx, StagedWrite::ReplaceConnector(connector.clone())).await
    }

    async fn upgrade_driver_and_configs(&self, driver: &MDriver, tx: &mut InMemoryTransaction) -> RepositoryResult<()> {
        self.stage(tx, StagedWrite::ReplaceDriver(driver.clone())).await
    }

    async fn update_link(&self, link: &MLink, tx: &mut InMemoryTransaction) -> RepositoryResult<()> {
        self.stage(tx, StagedWrite::UpdateLink(link.clone())).await
    }

    async fn update_job(&self, job: &MJob, tx: &mut InMemoryTransaction) -> RepositoryResult<()> {
        self.stage(tx, StagedWrite::UpdateJob(job.clone())).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use ferry_common::model::{InputValue, MConfig, MConfigList, MInput};

    fn link_schema() -> MConfigList {
        MConfigList::new(vec![MConfig::new("linkConfig", vec![MInput::string("url", 100)])])
    }

    async fn seeded() -> (InMemoryRepository, MLink) {
        let repo = InMemoryRepository::new();
        repo.register_connector(MConnector::new("c", "1", link_schema()))
            .await
            .unwrap();
        let mut config = link_schema();
        config.set_value("linkConfig.url", InputValue::from("jdbc:a")).unwrap();
        let link = repo.create_link(MLink::new("source", "c", config, "test_user")).await.unwrap();
        (repo, link)
    }

    #[tokio::test]
    async fn test_create_and_find_link() {
        let (repo, link) = seeded().await;
        let id = link.persistence_id.unwrap();
        assert_eq!(repo.find_link(id).await.unwrap().name, "source");
        assert_eq!(repo.find_links_for_connector("c").await.unwrap().len(), 1);
        assert!(repo.find_links_for_connector("other").await.unwrap().is_empty());

        let duplicate = repo.create_link(MLink::new("source", "c", link_schema(), "u")).await;
        assert!(matches!(duplicate, Err(RepositoryError::Duplicate { kind: "link", .. })));

        let orphan = repo.create_link(MLink::new("x", "missing", link_schema(), "u")).await;
        assert!(matches!(orphan, Err(RepositoryError::NotFound { kind: "connector", .. })));
    }

    #[tokio::test]
    async fn test_link_in_use_cannot_be_deleted() {
        let (repo, link) = seeded().await;
        let job = MJob::new(
            "copy",
            &link,
            &link,
            (MConfigList::default(), MConfigList::default(), MConfigList::default()),
            "test_user",
        );
        let job = repo.create_job(job).await.unwrap();
        let link_id = link.persistence_id.unwrap();

        let err = repo.delete_link(link_id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::InUse { ref used_by, .. } if used_by == "copy"));

        repo.delete_job(job.persistence_id.unwrap()).await.unwrap();
        repo.delete_link(link_id).await.unwrap();
        assert!(repo.find_links().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_enable_flags() {
        let (repo, link) = seeded().await;
        let id = link.persistence_id.unwrap();
        repo.enable_link(id, false).await.unwrap();
        assert!(!repo.find_link(id).await.unwrap().enabled);
        assert!(repo.enable_job(999, true).await.is_err());
    }

    #[tokio::test]
    async fn test_commit_applies_staged_writes() {
        let (repo, link) = seeded().await;
        let id = link.persistence_id.unwrap();
        let mut tx = repo.transaction();
        tx.begin().await.unwrap();

        repo.delete_link_inputs(id, &mut tx).await.unwrap();
        let mut config = link_schema();
        config.set_value("linkConfig.url", InputValue::from("jdbc:b")).unwrap();
        repo.update_link(&link.with_link_config(config), &mut tx).await.unwrap();
        assert_eq!(tx.staged_len(), 2);

        // nothing visible before commit
        let before = repo.find_link(id).await.unwrap();
        assert_eq!(before.config.string_value("linkConfig.url"), Some("jdbc:a"));

        tx.commit().await.unwrap();
        tx.close().await.unwrap();
        let after = repo.find_link(id).await.unwrap();
        assert_eq!(after.config.string_value("linkConfig.url"), Some("jdbc:b"));
    }

    #[tokio::test]
    async fn test_rollback_and_close_discard_writes() {
        let (repo, link) = seeded().await;
        let id = link.persistence_id.unwrap();

        let mut tx = repo.transaction();
        tx.begin().await.unwrap();
        repo.delete_link_inputs(id, &mut tx).await.unwrap();
        tx.rollback().await.unwrap();
        tx.close().await.unwrap();
        tx.close().await.unwrap();
        assert_eq!(tx.state(), TransactionState::Closed);

        let mut abandoned = repo.transaction();
        abandoned.begin().await.unwrap();
        repo.delete_link_inputs(id, &mut abandoned).await.unwrap();
        abandoned.close().await.unwrap();

        let link = repo.find_link(id).await.unwrap();
        assert_eq!(link.config.string_value("linkConfig.url"), Some("jdbc:a"));
    }

    #[tokio::test]
    async fn test_inactive_transaction_rejects_writes() {
        let (repo, link) = seeded().await;
        let id = link.persistence_id.unwrap();

        let mut tx = repo.transaction();
        let err = repo.delete_link_inputs(id, &mut tx).await.unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::TransactionNotActive {
                state: TransactionState::Created,
                ..
            }
        ));

        tx.begin().await.unwrap();
        assert!(matches!(
            tx.begin().await,
            Err(RepositoryError::TransactionAlreadyStarted { .. })
        ));
        tx.commit().await.unwrap();
        assert!(tx.commit().await.is_err());
        assert!(tx.rollback().await.is_err());
    }

    #[tokio::test]
    async fn test_staging_unknown_entity_fails() {
        let (repo, _) = seeded().await;
        let mut tx = repo.transaction();
        tx.begin().await.unwrap();
        assert!(matches!(
            repo.delete_job_inputs(42, &mut tx).await,
            Err(RepositoryError::NotFound { kind: "job", .. })
        ));
        let unknown = MConnector::new("nope", "2", link_schema());
        assert!(repo.upgrade_connector_and_configs(&unknown, &mut tx).await.is_err());
        assert_eq!(tx.staged_len(), 0);
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let (repo, link) = seeded().await;
        let id = link.persistence_id.unwrap();
        let mut tx = repo.transaction();
        tx.begin().await.unwrap();
        repo.upgrade_connector_and_configs(&MConnector::new("c", "2", link_schema()), &mut tx)
            .await
            .unwrap();
        repo.delete_link_inputs(id, &mut tx).await.unwrap();

        // the link disappears between staging and commit
        repo.delete_link(id).await.unwrap();
        assert!(tx.commit().await.is_err());
        tx.rollback().await.unwrap();

        let connector = repo.find_connector("c").await.unwrap().unwrap();
        assert_eq!(connector.version, "1");
    }

    #[tokio::test]
    async fn test_transaction_from_other_repository_is_rejected() {
        let (repo, link) = seeded().await;
        let other = InMemoryRepository::new();
        let mut tx = other.transaction();
        tx.begin().await.unwrap();
        let err = repo
            .delete_link_inputs(link.persistence_id.unwrap(), &mut tx)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Storage(_)));
    }
}
