use crate::error::AppError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Currencies the payment processor charges in whole units.
const ZERO_DECIMAL_CURRENCIES: [&str; 3] = ["jpy", "krw", "vnd"];

/// A strictly positive price or charge.
///
/// Wraps `rust_decimal::Decimal` so prices never pick up binary floating point
/// error on the way to the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, AppError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(AppError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to the integer minor units the payment processor expects
    /// (cents for most currencies, whole units for zero-decimal ones).
    pub fn to_minor_units(&self, currency: &Currency) -> Result<i64, AppError> {
        let scale = if currency.is_zero_decimal() {
            Decimal::ONE
        } else {
            Decimal::ONE_HUNDRED
        };
        self.0
            .checked_mul(scale)
            .ok_or_else(|| AppError::validation("Amount out of range"))?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or_else(|| AppError::validation("Amount out of range"))
    }

    /// Total for `quantity` units, or a validation error when it would overflow.
    pub fn checked_mul(&self, quantity: u32) -> Result<Self, AppError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .ok_or_else(|| AppError::validation("Amount out of range"))
            .and_then(Self::new)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AppError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// ISO 4217 currency code, kept lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self, AppError> {
        let code = code.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_lowercase()))
        } else {
            Err(AppError::validation(format!("Invalid currency code '{code}'")))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero_decimal(&self) -> bool {
        ZERO_DECIMAL_CURRENCIES.contains(&self.0.as_str())
    }
}

impl TryFrom<String> for Currency {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_minor_units() {
        let usd = Currency::new("USD").unwrap();
        let jpy = Currency::new("jpy").unwrap();

        assert_eq!(Amount::new(dec!(12.34)).unwrap().to_minor_units(&usd).unwrap(), 1234);
        assert_eq!(Amount::new(dec!(0.005)).unwrap().to_minor_units(&usd).unwrap(), 1);
        assert_eq!(Amount::new(dec!(1500)).unwrap().to_minor_units(&jpy).unwrap(), 1500);
    }

    #[test]
    fn test_amount_times_participants() {
        let price = Amount::new(dec!(25.50)).unwrap();
        assert_eq!(price.checked_mul(3).unwrap().value(), dec!(76.50));
    }

    #[test]
    fn test_amount_overflow_is_rejected() {
        let huge = Amount::new(Decimal::MAX).unwrap();
        assert!(matches!(huge.checked_mul(2), Err(AppError::ValidationError(_))));
        let usd = Currency::new("usd").unwrap();
        assert!(matches!(huge.to_minor_units(&usd), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_currency_normalization() {
        assert_eq!(Currency::new(" GBP ").unwrap().as_str(), "gbp");
        assert!(Currency::new("pounds").is_err());
        assert!(Currency::new("u$d").is_err());
    }

    #[test]
    fn test_amount_rejects_non_positive_json() {
        let parsed: Result<Amount, _> = serde_json::from_str("\"0\"");
        assert!(parsed.is_err());
        let parsed: Amount = serde_json::from_str("\"19.99\"").unwrap();
        assert_eq!(parsed.value(), dec!(19.99));
    }
}
