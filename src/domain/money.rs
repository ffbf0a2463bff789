use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// For USD, 1 unit = 100 cents, so $50.00 = 5000 cents.
pub type Cents = i64;

/// Format cents as a human-readable currency string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000.
/// Digits past the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseCentsError::InvalidFormat(input.to_string()));
    }

    // ".50" and "-.50" are accepted as shorthand for "0.50"
    let normalized = match input.strip_prefix('-') {
        Some(rest) if rest.starts_with('.') => format!("-0{}", rest),
        _ if input.starts_with('.') => format!("0{}", input),
        _ => input.to_string(),
    };

    let value = Decimal::from_str(&normalized)
        .map_err(|_| ParseCentsError::InvalidFormat(input.to_string()))?;
    decimal_to_cents(value.round_dp_with_strategy(2, RoundingStrategy::ToZero))
        .ok_or(ParseCentsError::OutOfRange)
}

/// Convert a decimal amount in currency units into cents, rounding half away
/// from zero. Returns `None` if the value does not fit.
pub fn decimal_to_cents(value: Decimal) -> Option<Cents> {
    value
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// Convert cents into a decimal amount in currency units.
pub fn cents_to_decimal(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

/// Cents as display units, for payloads that carry plain JSON numbers.
pub fn cents_to_f64(cents: Cents) -> f64 {
    cents_to_decimal(cents).to_f64().unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCentsError {
    #[error("invalid money format: '{0}'")]
    InvalidFormat(String),

    #[error("amount out of range")]
    OutOfRange,
}
