//! Integral, floating point and decimal ranges
//!
//! The point functions return ordered boundaries `b0 < b1 < ... < bk` with
//! `b0 == min` and `bk == max`. They expect `min < max`; equal bounds are
//! turned into an equality partition before they get here.

use std::str::FromStr;

use bigdecimal::num_bigint::BigInt;
use bigdecimal::{BigDecimal, RoundingMode};
use tracing::warn;

use super::{ranges_from_points, Partition, PartitionColumnType};
use crate::error::PartitionError;

/// Scale used when rounding at the span's own scale yields a zero step
pub const DECIMAL_RETRY_SCALE: i64 = 20;

/// Split `[min, max]` into at most `count` integer steps.
///
/// The span is divided evenly and the remainder handed out one unit at a
/// time to the leading partitions. A span shorter than `count` yields one
/// partition per unit step.
pub fn integral_points(min: i64, max: i64, count: u32) -> Vec<i64> {
    let span = i128::from(max) - i128::from(min);
    let mut parts = i128::from(count.max(1));
    let remainder = span % parts;
    let interval = span / parts;
    if interval == 0 {
        parts = remainder;
    }

    let mut points = Vec::with_capacity(usize::try_from(parts).unwrap_or(0) + 1);
    points.push(min);
    let mut upper = i128::from(min);
    for i in 1..parts {
        upper += interval + i128::from(i <= remainder);
        // never passes max, so it fits
        points.push(upper as i64);
    }
    points.push(max);
    points
}

/// Boundaries at `min + i * step`, computed by multiplication so rounding
/// does not accumulate. The last boundary is `max` itself.
pub fn floating_points(min: f64, max: f64, count: u32) -> Vec<f64> {
    let parts = count.max(1);
    let step = (max - min) / f64::from(parts);
    let mut points = vec![min];
    for i in 1..parts {
        let point = min + f64::from(i) * step;
        let last = points[points.len() - 1];
        if point > last && point < max {
            points.push(point);
        }
    }
    points.push(max);
    points
}

/// Step size for a decimal range: the exact quotient when it terminates,
/// otherwise rounded half-up at the span's scale. A step that rounds to zero
/// is retried at [`DECIMAL_RETRY_SCALE`] and finally floored at one unit of
/// that scale.
pub fn decimal_step(min: &BigDecimal, max: &BigDecimal, count: u32) -> BigDecimal {
    let span = max - min;
    let divisor = BigDecimal::from(count.max(1));
    let (_, scale) = span.as_bigint_and_exponent();
    let quotient = &span / &divisor;
    let zero = BigDecimal::from(0);

    let step = if &quotient * &divisor == span {
        let exact = quotient.normalized();
        if exact.as_bigint_and_exponent().1 < scale {
            exact.with_scale(scale)
        } else {
            exact
        }
    } else {
        quotient.with_scale_round(scale, RoundingMode::HalfUp)
    };
    if step != zero {
        return step;
    }

    let retried = quotient.with_scale_round(DECIMAL_RETRY_SCALE, RoundingMode::HalfUp);
    if retried != zero {
        return retried;
    }
    warn!(span = %span, count, "Decimal range too narrow, using minimum step");
    BigDecimal::new(BigInt::from(1), DECIMAL_RETRY_SCALE)
}

/// Boundaries at `min + i * step` for `i < count` while below `max`, then
/// `max`. A step rounded upwards can stop short of `count` partitions; the
/// last one always ends at the true maximum.
pub fn decimal_points(min: &BigDecimal, max: &BigDecimal, count: u32) -> Vec<BigDecimal> {
    let step = decimal_step(min, max, count);
    let mut points = vec![min.clone()];
    for i in 1..count.max(1) {
        let point = min + &(&step * &BigDecimal::from(i));
        if &point >= max {
            break;
        }
        points.push(point);
    }
    points.push(max.clone());
    points
}

fn invalid(column: &str, column_type: PartitionColumnType, which: &'static str, value: &str, reason: impl ToString) -> PartitionError {
    PartitionError::InvalidBound {
        column: column.to_string(),
        column_type: column_type.to_string(),
        which,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn inverted(column: &str, min: &str, max: &str) -> PartitionError {
    PartitionError::InvertedBounds {
        column: column.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

pub(crate) fn parse_i64(
    column: &str,
    column_type: PartitionColumnType,
    which: &'static str,
    raw: &str,
) -> Result<i64, PartitionError> {
    raw.trim()
        .parse()
        .map_err(|e| invalid(column, column_type, which, raw, e))
}

/// Parse and order-check an integral range, returning `None` for `min == max`
pub(crate) fn integral_range(
    column: &str,
    column_type: PartitionColumnType,
    min_raw: &str,
    max_raw: &str,
) -> Result<Option<(i64, i64)>, PartitionError> {
    let min = parse_i64(column, column_type, "minimum", min_raw)?;
    let max = parse_i64(column, column_type, "maximum", max_raw)?;
    match min.cmp(&max) {
        std::cmp::Ordering::Greater => Err(inverted(column, min_raw, max_raw)),
        std::cmp::Ordering::Equal => Ok(None),
        std::cmp::Ordering::Less => Ok(Some((min, max))),
    }
}

pub fn partition_integer(column: &str, min_raw: &str, max_raw: &str, count: u32) -> Result<Vec<Partition>, PartitionError> {
    let column_type = PartitionColumnType::Integer;
    let Some((min, max)) = integral_range(column, column_type, min_raw, max_raw)? else {
        return Ok(vec![Partition::equals(column, column_type, min_raw.trim())]);
    };
    let points: Vec<String> = integral_points(min, max, count)
        .into_iter()
        .map(|p| p.to_string())
        .collect();
    Ok(ranges_from_points(column, column_type, &points))
}

fn render_f64(value: f64) -> String {
    format!("{value:?}")
}

pub fn partition_floating(column: &str, min_raw: &str, max_raw: &str, count: u32) -> Result<Vec<Partition>, PartitionError> {
    let column_type = PartitionColumnType::Floating;
    let parse = |which, raw: &str| -> Result<f64, PartitionError> {
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|e| invalid(column, column_type, which, raw, e))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(invalid(column, column_type, which, raw, "not a finite number"))
        }
    };
    let min = parse("minimum", min_raw)?;
    let max = parse("maximum", max_raw)?;
    if min > max {
        return Err(inverted(column, min_raw, max_raw));
    }
    if min == max {
        return Ok(vec![Partition::equals(column, column_type, render_f64(min))]);
    }
    let points: Vec<String> = floating_points(min, max, count)
        .into_iter()
        .map(render_f64)
        .collect();
    Ok(ranges_from_points(column, column_type, &points))
}

pub fn partition_decimal(column: &str, min_raw: &str, max_raw: &str, count: u32) -> Result<Vec<Partition>, PartitionError> {
    let column_type = PartitionColumnType::Decimal;
    let parse = |which, raw: &str| {
        BigDecimal::from_str(raw.trim()).map_err(|e| invalid(column, column_type, which, raw, e))
    };
    let min = parse("minimum", min_raw)?;
    let max = parse("maximum", max_raw)?;
    if min > max {
        return Err(inverted(column, min_raw, max_raw));
    }
    if min == max {
        return Ok(vec![Partition::equals(column, column_type, min.to_string())]);
    }
    let points: Vec<String> = decimal_points(&min, &max, count)
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(ranges_from_points(column, column_type, &points))
}
