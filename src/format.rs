//! Presentation trimming for token amounts and USD values.

const ZERO_CURRENCY: &str = "$0.00";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountFormat {
    /// Fraction cap when the integer part is non-zero.
    pub max_frac: usize,
    /// Digits kept after the leading fractional zeros of a sub-1 value.
    pub min_sig: usize,
}

impl Default for AmountFormat {
    fn default() -> Self {
        Self {
            max_frac: 6,
            min_sig: 2,
        }
    }
}

pub fn format_token_amount(amount: &str) -> String {
    format_token_amount_with(amount, AmountFormat::default())
}

/// Trims a human amount for display.
///
/// Values with a non-zero integer part keep at most `max_frac` fractional
/// digits. Sub-1 values keep their leading fractional zeros followed by
/// `max(min_sig, min(max_frac, n))` of the `n` digits that follow them.
pub fn format_token_amount_with(amount: &str, opts: AmountFormat) -> String {
    if amount.is_empty() {
        return "0".to_string();
    }
    let Some((whole, rest)) = amount.split_once('.') else {
        return amount.to_string();
    };
    let frac_raw = rest.split('.').next().unwrap_or_default();

    if whole.bytes().any(|b| b != b'0') {
        let frac: String = frac_raw.chars().take(opts.max_frac).collect();
        return trim_fraction(format!("{whole}.{frac}"));
    }

    let leading_len = frac_raw.bytes().take_while(|b| *b == b'0').count();
    let (leading, after) = frac_raw.split_at(leading_len);
    let digits_len = after.bytes().take_while(u8::is_ascii_digit).count();
    let digits = &after[..digits_len];
    let keep = opts.min_sig.max(opts.max_frac.min(digits.len()));
    let significant = &digits[..keep.min(digits.len())];
    trim_fraction(format!("0.{leading}{significant}"))
}

/// Renders a USD value: two fractional digits at or above one dollar, four
/// significant digits below.
pub fn format_currency(amount: Option<f64>) -> String {
    let Some(value) = amount.filter(|v| v.is_finite() && *v != 0.0) else {
        return ZERO_CURRENCY.to_string();
    };

    let rendered = if value >= 1.0 {
        format!("{value:.2}")
    } else {
        let magnitude = value.abs().log10().floor() as i32;
        let decimals = (3 - magnitude).max(0) as usize;
        format!("{value:.decimals$}")
    };

    let (sign, unsigned) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered.as_str()),
    };
    let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let frac = frac.trim_end_matches('0');
    let int = group_thousands(int);
    if frac.is_empty() {
        format!("${sign}{int}")
    } else {
        format!("${sign}{int}.{frac}")
    }
}

fn trim_fraction(value: String) -> String {
    if !value.contains('.') {
        return value;
    }
    let trimmed = value.trim_end_matches('0');
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
