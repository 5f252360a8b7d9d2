//! Display formatting for prices and percentages

use pricing_engine::round_half_up;
use rust_decimal::Decimal;

/// Brazilian currency notation: `R$ 1.234,56`
pub fn format_currency(value: Decimal) -> String {
    let mut rounded = round_half_up(value, 2);
    rounded.rescale(2);
    let negative = rounded < Decimal::ZERO;
    let digits = rounded.abs().to_string();
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("R$ {sign}{grouped},{fraction}")
}

/// Percentage points with one decimal: `30.0%`
pub fn format_percentage(value: Decimal) -> String {
    let mut rounded = round_half_up(value, 1);
    rounded.rescale(1);
    format!("{rounded}%")
}
