//! Ferry Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared model, validation, and error handling for the Ferry workspace.
//!
//! # Overview
//!
//! - **Model**: configurables (connectors and the driver), their config groups
//!   and inputs, plus the links and jobs that hold concrete values
//! - **Validation**: per-input and per-config validators with worst-status
//!   aggregation
//! - **Context**: the string-keyed bag passed between job stages
//! - **Logging**: tracing subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use ferry_common::model::{InputValue, MConfig, MConfigList, MInput};
//! use ferry_common::validation::validate_configs;
//!
//! fn check() -> ferry_common::Result<()> {
//!     let mut configs = MConfigList::new(vec![MConfig::new(
//!         "linkConfig",
//!         vec![MInput::string("connectionString", 128)],
//!     )]);
//!     configs.set_value("linkConfig.connectionString", InputValue::from("jdbc:h2:mem"))?;
//!     assert!(validate_configs(&configs).can_proceed());
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod error;
pub mod logging;
pub mod model;
pub mod validation;

// Re-export commonly used types
pub use context::MutableContext;
pub use error::{FerryError, Result};
