// src/utils/format.rs
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Renders a fractional change as a signed percentage.
/// Example: 0.055 -> "+5.50%"
pub fn signed_pct(pct: Decimal) -> String {
    format!("{:+.2}%", (pct * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0))
}

/// Renders a fractional threshold as a bare percentage with no padding.
/// Example: 0.05 -> "5%"
pub fn bare_pct(fraction: Decimal) -> String {
    format!("{}%", (fraction * Decimal::ONE_HUNDRED).normalize())
}

/// Renders a dollar amount rounded to cents. Display only.
pub fn usd(amount: Decimal) -> String {
    format!("${:.2}", amount.to_f64().unwrap_or(0.0))
}
