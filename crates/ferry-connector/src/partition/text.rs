//! String ranges
//!
//! Strings are compared after stripping their common prefix. The first
//! [`MAX_CHARS_TO_CONVERT`] characters of each remainder are read as digits
//! of a number whose digits are the code points between the smallest and
//! the largest character of the two remainders, so numeric order matches
//! string order. The numeric range is split, and the interior boundaries are
//! decoded back to text.
//!
//! Interior boundaries only use characters lying between the bounds' own
//! characters, so they fit any charset able to store both bounds as long as
//! that charset is contiguous over the span. Characters past the fourth one
//! after the common prefix never influence interior boundaries; they only
//! appear in the first and last literals, which always reproduce the input
//! strings exactly.

use super::{ranges_from_points, Partition, PartitionColumnType};
use crate::error::PartitionError;

/// Significant characters considered after the common prefix. Interior
/// boundaries are at most this long past the prefix, so a range whose bounds
/// share a long prefix and then differ only far to the right is split
/// coarsely.
pub const MAX_CHARS_TO_CONVERT: usize = 4;

const SURROGATES: std::ops::RangeInclusive<u32> = 0xD800..=0xDFFF;

/// Fixed-width numbering of strings over a contiguous span of code points.
/// Digit 0 marks the end of the string, digit `d` is `first + d - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digits {
    first: u32,
    radix: u128,
}

impl Digits {
    /// Span the significant characters of both strings
    pub fn spanning(a: &str, b: &str) -> Self {
        let code_points = a
            .chars()
            .take(MAX_CHARS_TO_CONVERT)
            .chain(b.chars().take(MAX_CHARS_TO_CONVERT))
            .map(u32::from);
        let (first, last) = code_points.fold((u32::MAX, 0), |(lo, hi), c| (lo.min(c), hi.max(c)));
        if first > last {
            // both strings are empty
            return Self { first: 1, radix: 2 };
        }
        Self {
            first,
            radix: u128::from(last - first) + 2,
        }
    }

    /// Encode the leading characters of `s` as a fixed-width number. Every
    /// character must lie inside the span.
    pub fn encode(&self, s: &str) -> u128 {
        let mut chars = s.chars();
        (0..MAX_CHARS_TO_CONVERT).fold(0u128, |acc, _| {
            let digit = chars
                .next()
                .map_or(0, |c| u128::from(u32::from(c).saturating_sub(self.first)) + 1);
            acc * self.radix + digit
        })
    }

    /// Decode a number produced by [`Digits::encode`] or lying between two
    /// such numbers, rounding up to the next representable string. An
    /// interior zero digit followed by non-zero ones becomes the first
    /// character of the span. A digit inside the surrogate block becomes
    /// U+E000. Decoding stops after either.
    pub fn decode(&self, value: u128) -> String {
        let mut out = String::with_capacity(MAX_CHARS_TO_CONVERT);
        for position in (0..MAX_CHARS_TO_CONVERT as u32).rev() {
            let weight = self.radix.pow(position);
            // digit < radix <= 0x110001, so it fits in u32
            let digit = ((value / weight) % self.radix) as u32;
            if digit == 0 {
                if value % weight != 0 {
                    out.extend(char::from_u32(self.first));
                }
                break;
            }
            let code_point = self.first + digit - 1;
            if SURROGATES.contains(&code_point) {
                out.push('\u{E000}');
                break;
            }
            match char::from_u32(code_point) {
                Some(c) => out.push(c),
                None => break,
            }
        }
        out
    }
}

fn common_prefix<'a>(a: &'a str, b: &str) -> &'a str {
    let end = a
        .char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i);
    &a[..end]
}

/// Quote a string as a SQL literal
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Split points of the encoded range `[lo, hi]`, `lo < hi`.
///
/// Each step is re-quantized through decode/encode so every point is
/// exactly representable as text. Only strictly increasing points are kept.
pub fn text_points(digits: &Digits, lo: u128, hi: u128, count: u32) -> Vec<u128> {
    let count = count.max(1);
    let step = ((hi - lo) / u128::from(count)).max(1);
    let mut points = Vec::with_capacity(count as usize + 1);
    let mut current = lo;
    let mut parts = 0;
    while current <= hi && parts < count {
        if points.last().map_or(true, |last| current > *last) {
            points.push(current);
        }
        current = digits.encode(&digits.decode(current.saturating_add(step)));
        parts += 1;
    }
    if points.first() != Some(&lo) {
        points.insert(0, lo);
    }
    if points.last() != Some(&hi) {
        points.push(hi);
    }
    points
}

/// Partition a character column
pub fn partition_text(column: &str, min: &str, max: &str, count: u32) -> Result<Vec<Partition>, PartitionError> {
    let column_type = PartitionColumnType::Text;
    if min > max {
        return Err(PartitionError::InvertedBounds {
            column: column.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        });
    }
    if min == max {
        return Ok(vec![Partition::equals(column, column_type, quote(min))]);
    }

    let prefix = common_prefix(min, max);
    let (min_rest, max_rest) = (&min[prefix.len()..], &max[prefix.len()..]);
    let digits = Digits::spanning(min_rest, max_rest);
    let lo = digits.encode(min_rest);
    let hi = digits.encode(max_rest);
    if lo >= hi {
        // the strings differ only in characters the encoding cannot see
        return Ok(vec![Partition::range(column, column_type, quote(min), quote(max), true)]);
    }

    let points = text_points(&digits, lo, hi, count);
    let last = points.len() - 1;
    let literals: Vec<String> = points
        .iter()
        .enumerate()
        .map(|(i, point)| match i {
            0 => quote(min),
            i if i == last => quote(max),
            _ => quote(&format!("{prefix}{}", digits.decode(*point))),
        })
        .collect();
    Ok(ranges_from_points(column, column_type, &literals))
}
