//! Date, time and timestamp ranges
//!
//! Bounds arrive as epoch milliseconds (UTC). The range is split as an
//! integral one and every boundary is rendered back as a quoted SQL literal.

use chrono::{DateTime, Timelike, Utc};

use super::numeric::{integral_points, integral_range};
use super::{ranges_from_points, Partition, PartitionColumnType};
use crate::error::PartitionError;

/// Render epoch milliseconds as the literal a database compares against:
/// `'2004-10-20'`, `'01:01:01'` or `'2013-01-01 01:01:01.123'`.
///
/// Timestamps carry fractional seconds with trailing zeros removed, and at
/// least one digit.
pub fn render_epoch_millis(millis: i64, column_type: PartitionColumnType) -> Option<String> {
    let instant: DateTime<Utc> = DateTime::from_timestamp_millis(millis)?;
    let text = match column_type {
        PartitionColumnType::Date => instant.format("%Y-%m-%d").to_string(),
        PartitionColumnType::Time => instant.format("%H:%M:%S").to_string(),
        PartitionColumnType::Timestamp => {
            let fraction = format!("{:03}", instant.nanosecond() / 1_000_000);
            let fraction = fraction.trim_end_matches('0');
            let fraction = if fraction.is_empty() { "0" } else { fraction };
            format!("{}.{}", instant.format("%Y-%m-%d %H:%M:%S"), fraction)
        },
        _ => return None,
    };
    Some(format!("'{text}'"))
}

/// Partition a date, time or timestamp column
pub fn partition_temporal(
    column: &str,
    column_type: PartitionColumnType,
    min_raw: &str,
    max_raw: &str,
    count: u32,
) -> Result<Vec<Partition>, PartitionError> {
    let render = |which: &'static str, raw: &str, millis: i64| {
        render_epoch_millis(millis, column_type).ok_or_else(|| PartitionError::InvalidBound {
            column: column.to_string(),
            column_type: column_type.to_string(),
            which,
            value: raw.to_string(),
            reason: "outside the representable date range".to_string(),
        })
    };

    let Some((min, max)) = integral_range(column, column_type, min_raw, max_raw)? else {
        let millis = super::numeric::parse_i64(column, column_type, "minimum", min_raw)?;
        return Ok(vec![Partition::equals(column, column_type, render("minimum", min_raw, millis)?)]);
    };

    // bounds are checked up front so interior points cannot fail
    render("minimum", min_raw, min)?;
    render("maximum", max_raw, max)?;

    let mut points = integral_points(min, max, count)
        .into_iter()
        .map(|millis| render("boundary", "", millis))
        .collect::<Result<Vec<_>, _>>()?;
    // dates render whole days and times whole seconds, so neighbouring
    // millisecond boundaries can print the same literal
    points.dedup();
    if let [only] = points.as_slice() {
        return Ok(vec![Partition::equals(column, column_type, only.clone())]);
    }
    Ok(ranges_from_points(column, column_type, &points))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn date_millis(s: &str) -> String {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
            .to_string()
    }

    fn timestamp_millis(s: &str) -> String {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.3f")
            .unwrap()
            .and_utc()
            .timestamp_millis()
            .to_string()
    }

    fn conditions(partitions: &[Partition]) -> Vec<String> {
        partitions.iter().map(Partition::to_string).collect()
    }

    #[test]
    fn test_date_partition() {
        let partitions = partition_temporal(
            "DCOL",
            PartitionColumnType::Date,
            &date_millis("2004-10-20"),
            &date_millis("2013-10-17"),
            3,
        )
        .unwrap();
        assert_eq!(
            conditions(&partitions),
            vec![
                "'2004-10-20' <= DCOL AND DCOL < '2007-10-19'",
                "'2007-10-19' <= DCOL AND DCOL < '2010-10-18'",
                "'2010-10-18' <= DCOL AND DCOL <= '2013-10-17'",
            ]
        );
    }

    #[test]
    fn test_time_partition() {
        let start = timestamp_millis("1970-01-01 01:01:01.000");
        let end = timestamp_millis("1970-01-01 10:40:50.000");
        let partitions = partition_temporal("TCOL", PartitionColumnType::Time, &start, &end, 3).unwrap();
        assert_eq!(
            conditions(&partitions),
            vec![
                "'01:01:01' <= TCOL AND TCOL < '04:14:17'",
                "'04:14:17' <= TCOL AND TCOL < '07:27:33'",
                "'07:27:33' <= TCOL AND TCOL <= '10:40:50'",
            ]
        );
    }

    #[test]
    fn test_timestamp_partition() {
        let start = timestamp_millis("2013-01-01 01:01:01.123");
        let end = timestamp_millis("2013-12-31 10:40:50.654");
        let partitions =
            partition_temporal("TSCOL", PartitionColumnType::Timestamp, &start, &end, 3).unwrap();
        assert_eq!(
            conditions(&partitions),
            vec![
                "'2013-01-01 01:01:01.123' <= TSCOL AND TSCOL < '2013-05-02 12:14:17.634'",
                "'2013-05-02 12:14:17.634' <= TSCOL AND TSCOL < '2013-08-31 23:27:34.144'",
                "'2013-08-31 23:27:34.144' <= TSCOL AND TSCOL <= '2013-12-31 10:40:50.654'",
            ]
        );
    }

    #[test]
    fn test_timestamp_fraction_rendering() {
        let whole = timestamp_millis("2013-01-01 00:00:00.000").parse().unwrap();
        assert_eq!(
            render_epoch_millis(whole, PartitionColumnType::Timestamp).unwrap(),
            "'2013-01-01 00:00:00.0'"
        );
        assert_eq!(
            render_epoch_millis(whole + 100, PartitionColumnType::Timestamp).unwrap(),
            "'2013-01-01 00:00:00.1'"
        );
        assert!(render_epoch_millis(whole, PartitionColumnType::Integer).is_none());
    }

    #[test]
    fn test_single_date_is_equality() {
        let day = date_millis("2020-02-29");
        let partitions = partition_temporal("DCOL", PartitionColumnType::Date, &day, &day, 8).unwrap();
        assert_eq!(conditions(&partitions), vec!["DCOL = '2020-02-29'"]);
    }

    #[test]
    fn test_more_partitions_than_days() {
        let partitions = partition_temporal(
            "DCOL",
            PartitionColumnType::Date,
            &date_millis("2004-10-20"),
            &date_millis("2004-10-22"),
            5,
        )
        .unwrap();
        assert_eq!(
            conditions(&partitions),
            vec![
                "'2004-10-20' <= DCOL AND DCOL < '2004-10-21'",
                "'2004-10-21' <= DCOL AND DCOL <= '2004-10-22'",
            ]
        );
    }

    #[test]
    fn test_sub_second_time_range_is_equality() {
        let partitions = partition_temporal("TCOL", PartitionColumnType::Time, "3661000", "3661900", 3).unwrap();
        assert_eq!(conditions(&partitions), vec!["TCOL = '01:01:01'"]);
    }

    #[test]
    fn test_unparseable_date_bound() {
        let err = partition_temporal("DCOL", PartitionColumnType::Date, "2004-10-20", "0", 3).unwrap_err();
        assert!(matches!(err, PartitionError::InvalidBound { which: "minimum", .. }));
    }
}
