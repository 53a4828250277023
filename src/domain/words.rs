//! Amounts in words using the Indian numbering system (crore, lakh, thousand).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::money::round_money;

const ONES: [&str; 10] = [
    "", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine",
];

const TEENS: [&str; 10] = [
    "Ten",
    "Eleven",
    "Twelve",
    "Thirteen",
    "Fourteen",
    "Fifteen",
    "Sixteen",
    "Seventeen",
    "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const CRORE: u64 = 10_000_000;
const LAKH: u64 = 100_000;
const THOUSAND: u64 = 1_000;

/// `65000` becomes `Sixty Five Thousand Rupees Only`;
/// `1234.5` becomes `One Thousand Two Hundred Thirty Four Rupees and Fifty Paisa Only`.
pub fn amount_in_words(amount: Decimal) -> String {
    let rounded = round_money(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let absolute = rounded.abs();

    let rupees = absolute.trunc().to_u64().unwrap_or(0);
    let paisa = ((absolute - absolute.trunc()) * Decimal::ONE_HUNDRED)
        .to_u64()
        .unwrap_or(0);

    let rupee_words = if rupees == 0 {
        "Zero".to_string()
    } else {
        integer_words(rupees)
    };

    let mut text = format!("{} Rupees", rupee_words);
    if paisa > 0 {
        text.push_str(&format!(" and {} Paisa", integer_words(paisa)));
    }
    text.push_str(" Only");

    if negative {
        format!("Minus {}", text)
    } else {
        text
    }
}

/// Words for a positive integer; empty for zero.
fn integer_words(n: u64) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut rest = n;

    if rest >= CRORE {
        // Crore counts above 99 are spelled with the same grouping.
        parts.push(format!("{} Crore", integer_words(rest / CRORE)));
        rest %= CRORE;
    }
    if rest >= LAKH {
        parts.push(format!("{} Lakh", hundreds_words(rest / LAKH)));
        rest %= LAKH;
    }
    if rest >= THOUSAND {
        parts.push(format!("{} Thousand", hundreds_words(rest / THOUSAND)));
        rest %= THOUSAND;
    }
    if rest > 0 {
        parts.push(hundreds_words(rest));
    }

    parts.join(" ")
}

/// Words for 1..=999.
fn hundreds_words(n: u64) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let mut rest = n as usize;

    if rest >= 100 {
        parts.push(ONES[rest / 100]);
        parts.push("Hundred");
        rest %= 100;
    }
    if rest >= 20 {
        parts.push(TENS[rest / 10]);
        rest %= 10;
    } else if rest >= 10 {
        parts.push(TEENS[rest - 10]);
        rest = 0;
    }
    if rest > 0 {
        parts.push(ONES[rest]);
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_zero() {
        assert_eq!(amount_in_words(dec!(0)), "Zero Rupees Only");
    }

    #[test]
    fn test_whole_rupees() {
        assert_eq!(
            amount_in_words(dec!(65000)),
            "Sixty Five Thousand Rupees Only"
        );
        assert_eq!(amount_in_words(dec!(15)), "Fifteen Rupees Only");
        assert_eq!(amount_in_words(dec!(100)), "One Hundred Rupees Only");
    }

    #[test]
    fn test_lakh_and_crore() {
        assert_eq!(
            amount_in_words(dec!(12345678)),
            "One Crore Twenty Three Lakh Forty Five Thousand Six Hundred Seventy Eight Rupees Only"
        );
        assert_eq!(
            amount_in_words(dec!(1500000000)),
            "One Hundred Fifty Crore Rupees Only"
        );
    }

    #[test]
    fn test_paisa() {
        assert_eq!(
            amount_in_words(dec!(45454.55)),
            "Forty Five Thousand Four Hundred Fifty Four Rupees and Fifty Five Paisa Only"
        );
        assert_eq!(
            amount_in_words(dec!(0.5)),
            "Zero Rupees and Fifty Paisa Only"
        );
    }

    #[test]
    fn test_negative() {
        assert_eq!(amount_in_words(dec!(-250)), "Minus Two Hundred Fifty Rupees Only");
    }
}
