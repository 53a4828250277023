//! Monetary helpers: cent validation, ledger rounding and Indian-grouped formatting.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::{AppError, AppResult};

/// Minor-unit precision of every stored amount.
pub const MONEY_SCALE: u32 = 2;

/// Round to cents, half away from zero.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Largest amount a `NUMERIC(12,2)` column holds.
pub fn max_stored_amount() -> Decimal {
    Decimal::new(999_999_999_999, MONEY_SCALE)
}

/// Reject negative amounts, amounts with sub-cent precision and amounts too
/// large to store.
pub fn ensure_cents(field: &str, value: Decimal) -> AppResult<()> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::validation(format!("{} cannot be negative", field)));
    }
    if value > max_stored_amount() {
        return Err(AppError::validation(format!("{} is too large", field)));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(AppError::validation(format!(
            "{} must have at most {} decimal places",
            field, MONEY_SCALE
        )));
    }
    Ok(())
}

/// `1,23,456.78`: last three integer digits, then groups of two.
pub fn format_amount(value: Decimal) -> String {
    let rounded = round_money(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let grouped = group_indian(int_part);
    if negative {
        format!("-{}.{}", grouped, frac_part)
    } else {
        format!("{}.{}", grouped, frac_part)
    }
}

/// Rupee-prefixed amount: `₹1,23,456.78`.
pub fn format_inr(value: Decimal) -> String {
    let amount = format_amount(value);
    match amount.strip_prefix('-') {
        Some(rest) => format!("-₹{}", rest),
        None => format!("₹{}", amount),
    }
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_money(dec!(45454.545454)), dec!(45454.55));
        assert_eq!(round_money(dec!(0.005)), dec!(0.01));
        assert_eq!(round_money(dec!(-0.005)), dec!(-0.01));
        assert_eq!(round_money(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn test_ensure_cents() {
        assert!(ensure_cents("Amount", dec!(12.34)).is_ok());
        assert!(ensure_cents("Amount", dec!(12.340)).is_ok());
        assert!(ensure_cents("Amount", dec!(0)).is_ok());
        assert!(ensure_cents("Amount", dec!(12.345)).is_err());
        assert!(ensure_cents("Amount", dec!(-1)).is_err());
        assert!(ensure_cents("Amount", dec!(10000000000)).is_err());
    }

    #[test]
    fn test_format_amount_indian_grouping() {
        assert_eq!(format_amount(dec!(0)), "0.00");
        assert_eq!(format_amount(dec!(999)), "999.00");
        assert_eq!(format_amount(dec!(1000)), "1,000.00");
        assert_eq!(format_amount(dec!(65000)), "65,000.00");
        assert_eq!(format_amount(dec!(123456.78)), "1,23,456.78");
        assert_eq!(format_amount(dec!(12345678.9)), "1,23,45,678.90");
    }

    #[test]
    fn test_format_inr() {
        assert_eq!(format_inr(dec!(123456.78)), "₹1,23,456.78");
        assert_eq!(format_inr(dec!(-1500)), "-₹1,500.00");
    }
}
