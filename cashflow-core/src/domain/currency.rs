//! Brazilian real formatting for minor-unit amounts
//!
//! Amounts are integers in cents everywhere in the crate. This module is the
//! only place that converts between cents and the `R$ 1.234,56` text shown to
//! and typed by the user:
//!
//! - period as thousands separator, comma as decimal separator
//! - always two decimal digits
//! - `R$ ` prefix (`-R$ ` for negative values)

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::result::{Error, Result};

/// Currency symbol prefix
pub const CURRENCY_SYMBOL: &str = "R$";

/// Maximum number of significant digits accepted by the live input mask
pub const MAX_MASK_DIGITS: usize = 15;

/// Format minor units as a currency string, e.g. `150000` -> `"R$ 1.500,00"`
pub fn format_currency(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    format!("{}{} {}", sign, CURRENCY_SYMBOL, group(minor.unsigned_abs()))
}

/// Format minor units without the symbol, e.g. `150000` -> `"1.500,00"`
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    format!("{}{}", sign, group(minor.unsigned_abs()))
}

fn group(minor: u64) -> String {
    let units = (minor / 100).to_string();
    let cents = minor % 100;

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{},{:02}", grouped, cents)
}

/// Live input mask
///
/// Non-digits are dropped and the remaining digits are read as cents, so each
/// new keystroke shifts the previous digits one place to the left:
/// `"1"` -> `"0,01"`, `"15"` -> `"0,15"`, `"150000"` -> `"1.500,00"`.
/// Returns an empty string when no digits were typed.
pub fn mask_currency(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return String::new();
    }

    let significant = digits.trim_start_matches('0');
    let kept: String = significant.chars().take(MAX_MASK_DIGITS).collect();
    let minor = if kept.is_empty() {
        0
    } else {
        kept.parse::<u64>().unwrap_or(0)
    };

    group(minor)
}

/// Strip the symbol, whitespace and thousands separators and turn the
/// decimal comma into a period: `"R$ 1.500,00"` -> `"1500.00"`
pub fn clean_currency(display: &str) -> String {
    let stripped: String = display
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, 'R' | '$' | '.'))
        .collect();
    stripped.replacen(',', ".", 1)
}

/// Parse display text into major units; `None` for empty or non-numeric text
pub fn parse_major_units(display: &str) -> Option<Decimal> {
    let cleaned = clean_currency(display);
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

/// Convert major units to cents, rounding half away from zero
pub fn to_minor_units(major: Decimal) -> Option<i64> {
    (major * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Parse display text back into cents; empty text is zero
pub fn parse_currency(display: &str) -> Result<i64> {
    let cleaned = clean_currency(display);
    if cleaned.is_empty() {
        return Ok(0);
    }

    let major = Decimal::from_str(&cleaned)
        .map_err(|_| Error::validation(format!("'{}' is not a currency amount", display)))?;

    to_minor_units(major)
        .ok_or_else(|| Error::validation(format!("'{}' is out of range", display)))
}
