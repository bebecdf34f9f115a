//! Lossless conversion between human amounts ("1.5") and raw base-unit
//! amounts ("1500000").
//!
//! Everything here is digit-string manipulation. Raw token amounts routinely
//! exceed 2^53, so no value ever passes through `f64`.

use std::cmp::Ordering;

/// Converts a human decimal amount into an integer string of base units.
///
/// Non-digit characters are stripped from the integer and fractional parts
/// independently. The fraction is zero-padded or truncated (never rounded) to
/// exactly `denomination` digits.
pub fn to_raw_units(human: &str, denomination: u32) -> String {
    let trimmed = human.trim();
    let negative = trimmed.starts_with('-');
    let (int_part, frac_part) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    let int_digits = ascii_digits(int_part);
    let mut frac_digits = ascii_digits(frac_part);
    let width = denomination as usize;
    frac_digits.truncate(width);
    let frac_digits = format!("{frac_digits:0<width$}");

    let digits = strip_leading_zeros(&format!("{int_digits}{frac_digits}"));
    if negative && digits != "0" {
        format!("-{digits}")
    } else {
        digits
    }
}

/// Converts an integer string of base units into a human decimal amount.
///
/// The result carries no trailing fractional zeros and no trailing point.
pub fn to_human_units(raw: &str, denomination: u32) -> String {
    let normalized = strip_leading_zeros(&ascii_digits(raw));
    if denomination == 0 {
        return normalized;
    }

    let width = denomination as usize;
    let padded = if normalized.len() <= width {
        format!("{normalized:0>pad$}", pad = width + 1)
    } else {
        normalized
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - width);
    let frac = frac_part.trim_end_matches('0');
    if frac.is_empty() {
        int_part.to_string()
    } else {
        format!("{int_part}.{frac}")
    }
}

/// Returns true for a plain decimal string (`"12"`, `"-0.5"`, `".25"`).
pub fn is_numeric_amount(value: &str) -> bool {
    parse(value).is_some()
}

/// Returns true for a decimal string strictly greater than zero.
pub fn is_positive_amount(value: &str) -> bool {
    parse(value).is_some_and(|d| !d.negative && !d.is_zero())
}

/// Compares two non-negative decimal strings by value.
///
/// Returns `None` when either side is not a non-negative decimal.
pub fn compare_amounts(lhs: &str, rhs: &str) -> Option<Ordering> {
    let lhs = parse(lhs).filter(|d| !d.negative || d.is_zero())?;
    let rhs = parse(rhs).filter(|d| !d.negative || d.is_zero())?;

    let lhs_int = lhs.int.trim_start_matches('0');
    let rhs_int = rhs.int.trim_start_matches('0');
    let by_int = lhs_int
        .len()
        .cmp(&rhs_int.len())
        .then_with(|| lhs_int.cmp(rhs_int));
    if by_int != Ordering::Equal {
        return Some(by_int);
    }

    let lhs_frac = lhs.frac.trim_end_matches('0');
    let rhs_frac = rhs.frac.trim_end_matches('0');
    let width = lhs_frac.len().max(rhs_frac.len());
    Some(format!("{lhs_frac:0<width$}").cmp(&format!("{rhs_frac:0<width$}")))
}

struct Decimal<'a> {
    negative: bool,
    int: &'a str,
    frac: &'a str,
}

impl Decimal<'_> {
    fn is_zero(&self) -> bool {
        self.int.bytes().chain(self.frac.bytes()).all(|b| b == b'0')
    }
}

fn parse(value: &str) -> Option<Decimal<'_>> {
    let value = value.trim();
    let (negative, unsigned) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value.strip_prefix('+').unwrap_or(value)),
    };
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int.is_empty() && frac.is_empty()) || !all_digits(int) || !all_digits(frac) {
        return None;
    }
    Some(Decimal {
        negative,
        int,
        frac,
    })
}

fn ascii_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

fn strip_leading_zeros(digits: &str) -> String {
    match digits.trim_start_matches('0') {
        "" => "0".to_string(),
        stripped => stripped.to_string(),
    }
}
