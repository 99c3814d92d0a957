//! Range partitioning
//!
//! A partitioner turns the observed `[min, max]` of one column into an
//! ordered list of non-overlapping predicates that together cover the range.
//! Each predicate becomes the `WHERE` condition of one extraction task.
//!
//! The per-type arithmetic lives in the submodules:
//!
//! - [`numeric`]: integral, floating point and exact decimal ranges
//! - [`temporal`]: dates, times and timestamps as epoch milliseconds
//! - [`text`]: strings mapped onto a bounded integer space

mod bounds;
pub mod numeric;
pub mod temporal;
pub mod text;

use std::fmt;
use std::str::FromStr;

use ferry_common::model::MConfigList;
use ferry_common::MutableContext;
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;
use crate::error::PartitionError;

pub use bounds::{BoundValue, PartitionBounds};

/// Context key holding the partition column name
pub const PARTITION_COLUMN_NAME: &str = "ferry.jdbc.partition.column.name";
/// Context key holding the column type (a `java.sql.Types` code or a type name)
pub const PARTITION_COLUMN_TYPE: &str = "ferry.jdbc.partition.column.type";
pub const PARTITION_MIN_VALUE: &str = "ferry.jdbc.partition.min.value";
pub const PARTITION_MAX_VALUE: &str = "ferry.jdbc.partition.max.value";

/// How a column's values are split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionColumnType {
    Integer,
    Floating,
    Decimal,
    Date,
    Time,
    Timestamp,
    Boolean,
    Text,
    /// No partition column was configured
    None,
}

impl PartitionColumnType {
    /// Map a `java.sql.Types` code, the form JDBC metadata reports
    pub fn from_jdbc_code(code: i32) -> Result<Self, PartitionError> {
        let column_type = match code {
            -6 | 5 | 4 | -5 => PartitionColumnType::Integer, // TINYINT SMALLINT INTEGER BIGINT
            6..=8 => PartitionColumnType::Floating,           // FLOAT REAL DOUBLE
            2 | 3 => PartitionColumnType::Decimal,            // NUMERIC DECIMAL
            -7 | 16 => PartitionColumnType::Boolean,          // BIT BOOLEAN
            91 => PartitionColumnType::Date,
            92 => PartitionColumnType::Time,
            93 => PartitionColumnType::Timestamp,
            1 | 12 | -1 | -15 | -9 | -16 => PartitionColumnType::Text,
            other => return Err(PartitionError::UnsupportedType(format!("java.sql.Types code {other}"))),
        };
        Ok(column_type)
    }

    /// Read the type stored under [`PARTITION_COLUMN_TYPE`]: a numeric code
    /// or a SQL type name
    pub fn from_context_value(raw: &str) -> Result<Self, PartitionError> {
        let raw = raw.trim();
        match raw.parse::<i32>() {
            Ok(code) => Self::from_jdbc_code(code),
            Err(_) => raw.parse(),
        }
    }
}

impl FromStr for PartitionColumnType {
    type Err = PartitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TINYINT" | "SMALLINT" | "INTEGER" | "INT" | "BIGINT" => Ok(PartitionColumnType::Integer),
            "REAL" | "FLOAT" | "DOUBLE" => Ok(PartitionColumnType::Floating),
            "NUMERIC" | "DECIMAL" => Ok(PartitionColumnType::Decimal),
            "BIT" | "BOOLEAN" => Ok(PartitionColumnType::Boolean),
            "DATE" => Ok(PartitionColumnType::Date),
            "TIME" => Ok(PartitionColumnType::Time),
            "TIMESTAMP" => Ok(PartitionColumnType::Timestamp),
            "CHAR" | "VARCHAR" | "LONGVARCHAR" | "NCHAR" | "NVARCHAR" | "LONGNVARCHAR" => {
                Ok(PartitionColumnType::Text)
            },
            _ => Err(PartitionError::UnsupportedType(s.to_string())),
        }
    }
}

impl fmt::Display for PartitionColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartitionColumnType::Integer => "integer",
            PartitionColumnType::Floating => "floating point",
            PartitionColumnType::Decimal => "decimal",
            PartitionColumnType::Date => "date",
            PartitionColumnType::Time => "time",
            PartitionColumnType::Timestamp => "timestamp",
            PartitionColumnType::Boolean => "boolean",
            PartitionColumnType::Text => "text",
            PartitionColumnType::None => "none",
        };
        f.write_str(name)
    }
}

/// The condition a partition selects rows with. Literals are already
/// rendered as SQL (quoted where needed).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Every row
    All,
    IsNull,
    Equals { value: String },
    /// `lower <= col AND col < upper`, or `<= upper` when inclusive
    Range {
        lower: String,
        upper: String,
        upper_inclusive: bool,
    },
}

/// One unit of extraction work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    column: Option<String>,
    column_type: PartitionColumnType,
    predicate: Predicate,
}

impl Partition {
    /// The unconditioned partition used when no column is configured
    pub fn all() -> Self {
        Self {
            column: None,
            column_type: PartitionColumnType::None,
            predicate: Predicate::All,
        }
    }

    pub fn is_null(column: &str, column_type: PartitionColumnType) -> Self {
        Self {
            column: Some(column.to_string()),
            column_type,
            predicate: Predicate::IsNull,
        }
    }

    pub fn equals(column: &str, column_type: PartitionColumnType, value: impl Into<String>) -> Self {
        Self {
            column: Some(column.to_string()),
            column_type,
            predicate: Predicate::Equals {
                value: value.into(),
            },
        }
    }

    pub fn range(
        column: &str,
        column_type: PartitionColumnType,
        lower: impl Into<String>,
        upper: impl Into<String>,
        upper_inclusive: bool,
    ) -> Self {
        Self {
            column: Some(column.to_string()),
            column_type,
            predicate: Predicate::Range {
                lower: lower.into(),
                upper: upper.into(),
                upper_inclusive,
            },
        }
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn column_type(&self) -> PartitionColumnType {
        self.column_type
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Rendered `(lower, upper)` literals of a range partition
    pub fn bounds(&self) -> Option<(&str, &str)> {
        match &self.predicate {
            Predicate::Range { lower, upper, .. } => Some((lower, upper)),
            _ => None,
        }
    }

    /// The SQL condition, e.g. `-5 <= ICOL AND ICOL < -3`
    pub fn conditions(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.column.as_deref().unwrap_or_default();
        match &self.predicate {
            Predicate::All => f.write_str("1 = 1"),
            Predicate::IsNull => write!(f, "{column} IS NULL"),
            Predicate::Equals { value } => write!(f, "{column} = {value}"),
            Predicate::Range {
                lower,
                upper,
                upper_inclusive,
            } => {
                let op = if *upper_inclusive { "<=" } else { "<" };
                write!(f, "{lower} <= {column} AND {column} {op} {upper}")
            },
        }
    }
}

/// Turn ordered boundary literals `b0 < b1 < ... < bk` into the `k` range
/// partitions `[b0, b1) ... [b(k-1), bk]`
pub(crate) fn ranges_from_points(
    column: &str,
    column_type: PartitionColumnType,
    points: &[String],
) -> Vec<Partition> {
    let last = points.len().saturating_sub(2);
    points
        .windows(2)
        .enumerate()
        .map(|(i, pair)| Partition::range(column, column_type, &pair[0], &pair[1], i == last))
        .collect()
}

/// Everything a partitioner needs for one planning pass
#[derive(Debug, Clone)]
pub struct PartitionerContext {
    /// Column name, type and bounds written by the initializer stage
    pub context: MutableContext,
    /// Requested partition count; a hint, not a guarantee
    pub max_partitions: u32,
    /// Partitions of an earlier run, when re-partitioning
    pub prior_partitions: Option<Vec<Partition>>,
    pub user: String,
}

impl PartitionerContext {
    pub fn new(context: MutableContext, max_partitions: u32, user: impl Into<String>) -> Self {
        Self {
            context,
            max_partitions,
            prior_partitions: None,
            user: user.into(),
        }
    }

    pub fn with_prior_partitions(mut self, partitions: Vec<Partition>) -> Self {
        self.prior_partitions = Some(partitions);
        self
    }
}

/// Splits a job's source into partitions
pub trait Partitioner: Send + Sync {
    /// Plan the partitions of one job run. Pure: identical inputs yield an
    /// identical list.
    fn get_partitions(
        &self,
        context: &PartitionerContext,
        from_job_config: &MConfigList,
    ) -> Result<Vec<Partition>, ConnectorError>;
}
