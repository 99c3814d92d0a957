//! Ferry Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Server-side orchestration for the Ferry transfer engine.
//!
//! # Overview
//!
//! - **Repository**: the storage capability trait and an in-memory,
//!   transactional implementation ([`repository`])
//! - **Upgrades**: migrating stored link and job configs when a connector
//!   or the driver ships a new schema ([`upgrade`])
//! - **Planning**: splitting a job's source into extraction partitions
//!   ([`planning`])
//! - **Configuration**: environment-based settings ([`config`])
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ferry_connector::jdbc::GenericJdbcConnector;
//! use ferry_server::repository::InMemoryRepository;
//! use ferry_server::upgrade::{ConnectorManager, Driver};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let repository = InMemoryRepository::new();
//!     let connectors = ConnectorManager::new().with_connector(Arc::new(GenericJdbcConnector::new()));
//!     connectors.register_all(&repository, true).await?;
//!     Driver::new().register(&repository, true).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod planning;
pub mod repository;
pub mod upgrade;

pub use error::{InvalidEntity, PlanError, UpgradeError, UpgradeResult};
