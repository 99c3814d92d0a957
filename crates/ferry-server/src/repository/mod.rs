//! Persistence capabilities
//!
//! The server only talks to storage through [`Repository`]. Writes that must
//! land together (an upgrade replacing a schema and re-keying every link and
//! job) are staged on a [`RepositoryTransaction`] and applied on commit.

mod memory;

use std::fmt;

use async_trait::async_trait;
use ferry_common::model::{MConnector, MDriver, MJob, MLink};
use thiserror::Error;
use uuid::Uuid;

pub use memory::{InMemoryRepository, InMemoryTransaction};

/// Result type alias for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Lifecycle of a transaction handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Created,
    Active,
    Committed,
    RolledBack,
    Closed,
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionState::Created => "created",
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
            TransactionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepositoryError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("{kind} already exists: {key}")]
    Duplicate { kind: &'static str, key: String },

    #[error("{kind} {key} is still used by {used_by}")]
    InUse {
        kind: &'static str,
        key: String,
        used_by: String,
    },

    #[error("Transaction {id} is {state}, expected it to be active")]
    TransactionNotActive { id: Uuid, state: TransactionState },

    #[error("Transaction {id} was already started")]
    TransactionAlreadyStarted { id: Uuid },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        RepositoryError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

/// A unit of staged writes
#[async_trait]
pub trait RepositoryTransaction: Send + Sync {
    fn id(&self) -> Uuid;

    fn state(&self) -> TransactionState;

    fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    async fn begin(&mut self) -> RepositoryResult<()>;

    /// Apply every staged write, or none of them
    async fn commit(&mut self) -> RepositoryResult<()>;

    async fn rollback(&mut self) -> RepositoryResult<()>;

    /// Release the handle. Discards staged writes that were never committed.
    /// Closing twice is a no-op.
    async fn close(&mut self) -> RepositoryResult<()>;
}

/// Storage for configurables, links and jobs
#[async_trait]
pub trait Repository: Send + Sync {
    type Transaction: RepositoryTransaction;

    /// A fresh, not yet started transaction
    fn transaction(&self) -> Self::Transaction;

    // ------------------------------------------------------------------
    // Configurables
    // ------------------------------------------------------------------

    async fn register_connector(&self, connector: MConnector) -> RepositoryResult<MConnector>;

    async fn find_connector(&self, name: &str) -> RepositoryResult<Option<MConnector>>;

    async fn register_driver(&self, driver: MDriver) -> RepositoryResult<MDriver>;

    async fn find_driver(&self) -> RepositoryResult<Option<MDriver>>;

    // ------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------

    async fn create_link(&self, link: MLink) -> RepositoryResult<MLink>;

    async fn find_link(&self, id: i64) -> RepositoryResult<MLink>;

    async fn find_links(&self) -> RepositoryResult<Vec<MLink>>;

    async fn find_links_for_connector(&self, connector: &str) -> RepositoryResult<Vec<MLink>>;

    async fn enable_link(&self, id: i64, enabled: bool) -> RepositoryResult<()>;

    /// Fails with [`RepositoryError::InUse`] while a job references the link
    async fn delete_link(&self, id: i64) -> RepositoryResult<()>;

    // ------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------

    async fn create_job(&self, job: MJob) -> RepositoryResult<MJob>;

    async fn find_job(&self, id: i64) -> RepositoryResult<MJob>;

    async fn find_jobs(&self) -> RepositoryResult<Vec<MJob>>;

    /// Jobs using the connector on either side
    async fn find_jobs_for_connector(&self, connector: &str) -> RepositoryResult<Vec<MJob>>;

    async fn enable_job(&self, id: i64, enabled: bool) -> RepositoryResult<()>;

    async fn delete_job(&self, id: i64) -> RepositoryResult<()>;

    // ------------------------------------------------------------------
    // Transactional writes
    // ------------------------------------------------------------------

    async fn delete_link_inputs(&self, link_id: i64, tx: &mut Self::Transaction) -> RepositoryResult<()>;

    async fn delete_job_inputs(&self, job_id: i64, tx: &mut Self::Transaction) -> RepositoryResult<()>;

    /// Replace a stored connector's schema, keeping its identity
    async fn upgrade_connector_and_configs(
        &self,
        connector: &MConnector,
        tx: &mut Self::Transaction,
    ) -> RepositoryResult<()>;

    async fn upgrade_driver_and_configs(&self, driver: &MDriver, tx: &mut Self::Transaction) -> RepositoryResult<()>;

    async fn update_link(&self, link: &MLink, tx: &mut Self::Transaction) -> RepositoryResult<()>;

    async fn update_job(&self, job: &MJob, tx: &mut Self::Transaction) -> RepositoryResult<()>;
}
