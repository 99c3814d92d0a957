//! Configurable schemas and the entities that carry their values
//!
//! A configurable (a connector or the driver) publishes ordered config
//! groups of typed inputs. Links and jobs hold clones of those groups
//! populated with concrete values.

mod config;
mod configurable;
mod entity;
mod input;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use config::{MConfig, MConfigList};
pub use configurable::{MConnector, MDriver, DRIVER_NAME};
pub use entity::{AuditInfo, MJob, MLink};
pub use input::{InputType, InputValue, MInput};

/// Side of a job a connector is used on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    From,
    To,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::From => f.write_str("FROM"),
            Direction::To => f.write_str("TO"),
        }
    }
}
