//! Writing partition bounds into the job context
//!
//! The initializer stage queries the source for `MIN(col)` and `MAX(col)`
//! and stores them, together with the column name and type, under the
//! `ferry.jdbc.partition.*` keys the partitioner reads.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use ferry_common::MutableContext;

use super::{
    PartitionColumnType, PARTITION_COLUMN_NAME, PARTITION_COLUMN_TYPE, PARTITION_MAX_VALUE,
    PARTITION_MIN_VALUE,
};

/// A typed bound as read from the source database
#[derive(Debug, Clone, PartialEq)]
pub enum BoundValue {
    Integer(i64),
    Floating(f64),
    Decimal(BigDecimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    Boolean(bool),
    Text(String),
}

impl BoundValue {
    /// The serialized form stored in the context: numbers as written,
    /// temporal values as epoch milliseconds, booleans as `1`/`0`
    pub fn to_context_string(&self) -> String {
        match self {
            BoundValue::Integer(v) => v.to_string(),
            BoundValue::Floating(v) => format!("{v:?}"),
            BoundValue::Decimal(v) => v.to_string(),
            BoundValue::Date(d) => d.and_time(NaiveTime::default()).and_utc().timestamp_millis().to_string(),
            BoundValue::Time(t) => {
                let millis = i64::from(t.num_seconds_from_midnight()) * 1000
                    + i64::from(t.nanosecond() / 1_000_000);
                millis.to_string()
            },
            BoundValue::Timestamp(ts) => ts.timestamp_millis().to_string(),
            BoundValue::Boolean(b) => (if *b { "1" } else { "0" }).to_string(),
            BoundValue::Text(s) => s.clone(),
        }
    }
}

impl PartitionColumnType {
    /// Type name written to the context
    fn context_name(self) -> Option<&'static str> {
        match self {
            PartitionColumnType::Integer => Some("BIGINT"),
            PartitionColumnType::Floating => Some("DOUBLE"),
            PartitionColumnType::Decimal => Some("DECIMAL"),
            PartitionColumnType::Date => Some("DATE"),
            PartitionColumnType::Time => Some("TIME"),
            PartitionColumnType::Timestamp => Some("TIMESTAMP"),
            PartitionColumnType::Boolean => Some("BOOLEAN"),
            PartitionColumnType::Text => Some("VARCHAR"),
            PartitionColumnType::None => None,
        }
    }
}

/// Column bounds discovered at initialization time
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionBounds {
    pub column: String,
    pub column_type: PartitionColumnType,
    /// `None` when the column only holds NULLs
    pub min: Option<BoundValue>,
    pub max: Option<BoundValue>,
}

impl PartitionBounds {
    pub fn new(column: impl Into<String>, column_type: PartitionColumnType) -> Self {
        Self {
            column: column.into(),
            column_type,
            min: None,
            max: None,
        }
    }

    pub fn range(mut self, min: BoundValue, max: BoundValue) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Store the bounds under the partition keys. Absent bounds remove any
    /// stale value.
    pub fn write_to(&self, context: &mut MutableContext) {
        context.set_string(PARTITION_COLUMN_NAME, self.column.as_str());
        match self.column_type.context_name() {
            Some(name) => context.set_string(PARTITION_COLUMN_TYPE, name),
            None => {
                context.remove(PARTITION_COLUMN_TYPE);
            },
        }
        for (key, bound) in [(PARTITION_MIN_VALUE, &self.min), (PARTITION_MAX_VALUE, &self.max)] {
            match bound {
                Some(value) => context.set_string(key, value.to_context_string()),
                None => {
                    context.remove(key);
                },
            }
        }
    }
}
