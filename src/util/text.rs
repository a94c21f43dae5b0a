use std::{collections::HashSet, str::FromStr};

use anyhow::{anyhow, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Formatting characters removed before a number is parsed.
const NUMBER_ESCAPE_CHAR: &[char] = &['$', ',', ' ', '\u{a0}', '"', '\t', '\r', '\n'];

/// Parses a decimal value from a given string.
///
/// The input may carry a currency symbol, thousands separators and stray
/// whitespace, e.g. `$1,234.56`. `escape_chars` adds more characters to drop.
///
/// # Example
///
/// ```
/// let value = parse_decimal("$1,234.56", None).unwrap();
/// assert_eq!(value, dec!(1234.56));
/// ```
pub fn parse_decimal(s: &str, escape_chars: Option<Vec<char>>) -> Result<Decimal> {
    let cleaned = clean_escape_chars(s, escape_chars);
    Decimal::from_str(&cleaned)
        .map_err(|why| anyhow!("Failed to parse '{}' as Decimal because {:?}", cleaned, why))
}

/// Removes the number escape characters, plus `escape_chars`, from `s`.
pub(crate) fn clean_escape_chars(s: &str, escape_chars: Option<Vec<char>>) -> String {
    let mut combined: Vec<char> = NUMBER_ESCAPE_CHAR.to_vec();
    if let Some(ec) = escape_chars {
        combined.extend(ec);
    }

    let filters = combined.iter().collect::<HashSet<_>>();
    s.chars().filter(|c| !filters.contains(c)).collect()
}

/// Renders `value` with `dp` decimals and `,` between every group of three
/// integer digits, e.g. `8551.652` -> `8,551.65`.
///
/// Midpoints round away from zero.
pub fn format_thousands(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let plain = format!("{:.*}", dp as usize, rounded.abs());
    let (integer, fraction) = match plain.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (plain.as_str(), None),
    };

    let mut grouped = String::with_capacity(plain.len() + integer.len() / 3 + 1);
    if rounded.is_sign_negative() && !rounded.is_zero() {
        grouped.push('-');
    }

    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    if let Some(f) = fraction {
        grouped.push('.');
        grouped.push_str(f);
    }

    grouped
}
