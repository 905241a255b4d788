//! Amount conversion arithmetic.
//!
//! Amounts round half away from zero to 2 decimal places. Both the
//! original and the converted amount are always persisted.

use rust_decimal::{Decimal, RoundingStrategy};

/// Converts an amount using the given exchange rate.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal) -> Decimal {
    round_amount(amount * rate)
}

/// Rounds a monetary amount to 2 decimal places, half away from zero.
#[must_use]
pub fn round_amount(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_convert_basic() {
        // 250.50 EUR * 1.10 = 275.55 USD
        assert_eq!(convert_amount(dec!(250.50), dec!(1.10)), dec!(275.55));
    }

    #[test]
    fn test_convert_rounds_to_two_decimals() {
        // 100 * 1.23456 = 123.456 -> 123.46
        assert_eq!(convert_amount(dec!(100), dec!(1.23456)), dec!(123.46));
    }

    #[test]
    fn test_half_rounds_away_from_zero() {
        assert_eq!(round_amount(dec!(2.125)), dec!(2.13));
        assert_eq!(round_amount(dec!(2.135)), dec!(2.14));
        assert_eq!(round_amount(dec!(-2.125)), dec!(-2.13));
    }

    #[test]
    fn test_identity_rate() {
        assert_eq!(convert_amount(dec!(100.00), Decimal::ONE), dec!(100.00));
    }
}
