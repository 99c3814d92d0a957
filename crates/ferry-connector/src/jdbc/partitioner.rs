//! Partitioner of the generic JDBC connector
//!
//! Reads the column name, type and bounds the initializer stored in the
//! job context and dispatches to the arithmetic for that type.

use ferry_common::model::MConfigList;
use tracing::{debug, instrument};

use super::config::ALLOW_NULL_IN_PARTITION_COLUMN;
use crate::error::{ConnectorError, PartitionError};
use crate::partition::numeric::{partition_decimal, partition_floating, partition_integer};
use crate::partition::temporal::partition_temporal;
use crate::partition::text::partition_text;
use crate::partition::{
    Partition, PartitionColumnType, Partitioner, PartitionerContext, PARTITION_COLUMN_NAME,
    PARTITION_COLUMN_TYPE, PARTITION_MAX_VALUE, PARTITION_MIN_VALUE,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericJdbcPartitioner;

impl Partitioner for GenericJdbcPartitioner {
    #[instrument(skip_all, fields(user = %context.user, requested = context.max_partitions))]
    fn get_partitions(
        &self,
        context: &PartitionerContext,
        from_job_config: &MConfigList,
    ) -> Result<Vec<Partition>, ConnectorError> {
        let values = &context.context;
        let Some(column) = values.get_string(PARTITION_COLUMN_NAME).filter(|c| !c.is_empty()) else {
            debug!("No partition column, extracting in a single partition");
            return Ok(vec![Partition::all()]);
        };

        let column_type = values
            .get_string(PARTITION_COLUMN_TYPE)
            .ok_or_else(|| PartitionError::MissingColumnType {
                column: column.to_string(),
            })
            .and_then(PartitionColumnType::from_context_value)?;

        if let Some(prior) = &context.prior_partitions {
            debug!(prior = prior.len(), "Ignoring partitions of an earlier run");
        }

        let (min, max) = match (values.get_string(PARTITION_MIN_VALUE), values.get_string(PARTITION_MAX_VALUE)) {
            (Some(min), Some(max)) => (min, max),
            (None, None) => {
                debug!(column, "Column only holds NULLs");
                return Ok(vec![Partition::is_null(column, column_type)]);
            },
            (Some(_), None) => return Err(missing_bound(column, "minimum", "maximum").into()),
            (None, Some(_)) => return Err(missing_bound(column, "maximum", "minimum").into()),
        };

        // the IS NULL partition comes on top of the requested ranges
        let count = context.max_partitions.max(1);
        let allow_null = from_job_config.bool_value(ALLOW_NULL_IN_PARTITION_COLUMN).unwrap_or(false);

        let ranges = match column_type {
            PartitionColumnType::Integer => partition_integer(column, min, max, count)?,
            PartitionColumnType::Floating => partition_floating(column, min, max, count)?,
            PartitionColumnType::Decimal => partition_decimal(column, min, max, count)?,
            PartitionColumnType::Date | PartitionColumnType::Time | PartitionColumnType::Timestamp => {
                partition_temporal(column, column_type, min, max, count)?
            },
            PartitionColumnType::Boolean => partition_boolean(column, min, max)?,
            PartitionColumnType::Text => partition_text(column, min, max, count)?,
            PartitionColumnType::None => {
                return Err(PartitionError::UnsupportedType(column_type.to_string()).into());
            },
        };

        let mut partitions = Vec::with_capacity(ranges.len() + 1);
        if allow_null {
            partitions.push(Partition::is_null(column, column_type));
        }
        partitions.extend(ranges);
        debug!(column, %column_type, partitions = partitions.len(), "Planned partitions");
        Ok(partitions)
    }
}

fn missing_bound(column: &str, present: &'static str, missing: &'static str) -> PartitionError {
    PartitionError::MissingBound {
        column: column.to_string(),
        present,
        missing,
    }
}

fn parse_bool(column: &str, which: &'static str, raw: &str) -> Result<bool, PartitionError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(PartitionError::InvalidBound {
            column: column.to_string(),
            column_type: PartitionColumnType::Boolean.to_string(),
            which,
            value: raw.to_string(),
            reason: "expected 1, 0, true or false".to_string(),
        }),
    }
}

/// A boolean column has at most two values, whatever count was requested
fn partition_boolean(column: &str, min_raw: &str, max_raw: &str) -> Result<Vec<Partition>, PartitionError> {
    let min = parse_bool(column, "minimum", min_raw)?;
    let max = parse_bool(column, "maximum", max_raw)?;
    let literal = |b: bool| if b { "TRUE" } else { "FALSE" };
    let column_type = PartitionColumnType::Boolean;
    if min == max {
        return Ok(vec![Partition::equals(column, column_type, literal(min))]);
    }
    Ok(vec![
        Partition::equals(column, column_type, literal(true)),
        Partition::equals(column, column_type, literal(false)),
    ])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::jdbc::config::from_job_config;
    use ferry_common::MutableContext;

    fn context(column: &str, column_type: &str, min: &str, max: &str) -> MutableContext {
        let mut context = MutableContext::new();
        context.set_string(PARTITION_COLUMN_NAME, column);
        context.set_string(PARTITION_COLUMN_TYPE, column_type);
        context.set_string(PARTITION_MIN_VALUE, min);
        context.set_string(PARTITION_MAX_VALUE, max);
        context
    }

    fn partition(context: MutableContext, count: u32) -> Result<Vec<String>, ConnectorError> {
        let context = PartitionerContext::new(context, count, "test_user");
        GenericJdbcPartitioner
            .get_partitions(&context, &from_job_config())
            .map(|partitions| partitions.iter().map(Partition::to_string).collect())
    }

    #[test]
    fn test_integer_even_partition() {
        let partitions = partition(context("ICOL", "4", "-5", "5"), 5).unwrap();
        assert_eq!(
            partitions,
            vec![
                "-5 <= ICOL AND ICOL < -3",
                "-3 <= ICOL AND ICOL < -1",
                "-1 <= ICOL AND ICOL < 1",
                "1 <= ICOL AND ICOL < 3",
                "3 <= ICOL AND ICOL <= 5",
            ]
        );
    }

    #[test]
    fn test_integer_over_partition() {
        let partitions = partition(context("ICOL", "-5", "-5", "5"), 13).unwrap();
        assert_eq!(partitions.len(), 10);
        assert_eq!(partitions[0], "-5 <= ICOL AND ICOL < -4");
        assert_eq!(partitions[9], "4 <= ICOL AND ICOL <= 5");
    }

    #[test]
    fn test_floating_uneven_partition() {
        let partitions = partition(context("DCOL", "8", "-5.0", "5.0"), 3).unwrap();
        assert_eq!(
            partitions,
            vec![
                "-5.0 <= DCOL AND DCOL < -1.6666666666666665",
                "-1.6666666666666665 <= DCOL AND DCOL < 1.666666666666667",
                "1.666666666666667 <= DCOL AND DCOL <= 5.0",
            ]
        );
    }

    #[test]
    fn test_numeric_equal_bounds() {
        let partitions = partition(context("DCOL", "2", "-5", "-5"), 3).unwrap();
        assert_eq!(partitions, vec!["DCOL = -5"]);
    }

    #[test]
    fn test_boolean_partition() {
        let partitions = partition(context("BCOL", "16", "0", "1"), 3).unwrap();
        assert_eq!(partitions, vec!["BCOL = TRUE", "BCOL = FALSE"]);

        let partitions = partition(context("BCOL", "BOOLEAN", "true", "true"), 3).unwrap();
        assert_eq!(partitions, vec!["BCOL = TRUE"]);

        let err = partition(context("BCOL", "16", "0", "yes"), 3).unwrap_err();
        assert!(err.is_initialization_error());
    }

    fn partition_with_nulls(context: MutableContext, count: u32) -> Vec<String> {
        let mut config = from_job_config();
        config.set_value(ALLOW_NULL_IN_PARTITION_COLUMN, true.into()).unwrap();
        let context = PartitionerContext::new(context, count, "test_user");
        GenericJdbcPartitioner
            .get_partitions(&context, &config)
            .unwrap()
            .iter()
            .map(Partition::to_string)
            .collect()
    }

    #[test]
    fn test_null_partition_precedes_text_ranges() {
        assert_eq!(
            partition_with_nulls(context("VCCOL", "12", "AAA", "AAE"), 4),
            vec![
                "VCCOL IS NULL",
                "'AAA' <= VCCOL AND VCCOL < 'AAB'",
                "'AAB' <= VCCOL AND VCCOL < 'AAC'",
                "'AAC' <= VCCOL AND VCCOL < 'AAD'",
                "'AAD' <= VCCOL AND VCCOL <= 'AAE'",
            ]
        );
    }

    #[test]
    fn test_null_partition_is_added_to_requested_count() {
        assert_eq!(
            partition_with_nulls(context("C", "4", "0", "9"), 5),
            vec![
                "C IS NULL",
                "0 <= C AND C < 2",
                "2 <= C AND C < 4",
                "4 <= C AND C < 6",
                "6 <= C AND C < 8",
                "8 <= C AND C <= 9",
            ]
        );

        assert_eq!(
            partition_with_nulls(context("C", "4", "0", "9"), 1),
            vec!["C IS NULL", "0 <= C AND C <= 9"]
        );
    }

    #[test]
    fn test_no_column_selects_everything() {
        let partitions = partition(MutableContext::new(), 4).unwrap();
        assert_eq!(partitions, vec!["1 = 1"]);
    }

    #[test]
    fn test_only_nulls_and_missing_bounds() {
        let mut only_nulls = MutableContext::new();
        only_nulls.set_string(PARTITION_COLUMN_NAME, "ICOL");
        only_nulls.set_string(PARTITION_COLUMN_TYPE, "4");
        assert_eq!(partition(only_nulls.clone(), 3).unwrap(), vec!["ICOL IS NULL"]);

        only_nulls.set_string(PARTITION_MIN_VALUE, "1");
        let err = partition(only_nulls, 3).unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::Partition(PartitionError::MissingBound { missing: "maximum", .. })
        ));
    }

    #[test]
    fn test_missing_or_unknown_type() {
        let mut untyped = MutableContext::new();
        untyped.set_string(PARTITION_COLUMN_NAME, "ICOL");
        assert!(matches!(
            partition(untyped, 3).unwrap_err(),
            ConnectorError::Partition(PartitionError::MissingColumnType { .. })
        ));

        let err = partition(context("BLOBCOL", "2004", "1", "2"), 3).unwrap_err();
        assert!(matches!(err, ConnectorError::Partition(PartitionError::UnsupportedType(_))));
    }

    #[test]
    fn test_zero_requested_partitions_yields_one() {
        let partitions = partition(context("ICOL", "4", "1", "100"), 0).unwrap();
        assert_eq!(partitions, vec!["1 <= ICOL AND ICOL <= 100"]);
    }

    #[test]
    fn test_prior_partitions_do_not_change_the_plan() {
        let fresh = partition(context("ICOL", "4", "0", "9"), 3).unwrap();
        let rerun = PartitionerContext::new(context("ICOL", "4", "0", "9"), 3, "test_user")
            .with_prior_partitions(vec![Partition::all()]);
        let replanned: Vec<String> = GenericJdbcPartitioner
            .get_partitions(&rerun, &from_job_config())
            .unwrap()
            .iter()
            .map(Partition::to_string)
            .collect();
        assert_eq!(fresh, replanned);
    }
}
