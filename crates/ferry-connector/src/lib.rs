//! Ferry Connector SPI
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! What a connector provides to the server:
//!
//! - **Partitioning**: splitting a bounded column range into work units
//!   ([`partition`])
//! - **Upgrades**: per-version field mapping between config schemas
//!   ([`upgrade`])
//! - **The generic JDBC connector** built on both ([`jdbc`])

pub mod error;
pub mod jdbc;
pub mod partition;
pub mod spi;
pub mod upgrade;

pub use error::{ConnectorError, PartitionError};
pub use partition::{Partition, PartitionColumnType, Partitioner, PartitionerContext};
pub use spi::Connector;
pub use upgrade::{ConfigurableUpgrader, CopyMatchingUpgrader, UpgraderRegistry};
