//! Amount type for monetary values.
//!
//! This module provides the `Amount` type which wraps `Decimal`. Amounts are parsed from what a
//! person types into a form (which may carry a currency suffix or grouping separators) and from
//! the floating point numbers that the hosted record store keeps. Anything that is not a finite
//! number is rejected at that boundary, so sums can never become NaN.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// Represents an amount of money in the church's currency.
///
/// # Examples
///
/// ```
/// # use church_books::model::Amount;
/// # use std::str::FromStr;
/// let a = Amount::from_str("1 250,50 XAF").unwrap();
/// let b = Amount::from_str("1250.50").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

/// The largest magnitude accepted when parsing, far beyond any church's books. Keeping amounts
/// below it means sums cannot overflow `Decimal`.
const LIMIT: i64 = 1_000_000_000_000_000;

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Converts a floating point number, as stored by the record store, into an `Amount`.
    pub fn try_from_f64(value: f64) -> Result<Self, AmountError> {
        if !value.is_finite() {
            return Err(AmountError::NotFinite(value));
        }
        let d = Decimal::from_f64(value).ok_or(AmountError::NotFinite(value))?;
        within_limit(d.normalize(), || value.to_string())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// The value as a float for wire formats and display. Amounts are always finite.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.0.is_sign_positive()
    }
}

/// An error that can occur when turning text or floats into an `Amount`.
#[derive(Debug, Clone, PartialEq)]
pub enum AmountError {
    Empty,
    Invalid(String),
    NotFinite(f64),
    TooLarge(String),
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AmountError::Empty => write!(f, "An amount is required"),
            AmountError::Invalid(s) => write!(f, "'{s}' is not a valid amount"),
            AmountError::NotFinite(v) => write!(f, "{v} is not a finite amount"),
            AmountError::TooLarge(s) => {
                write!(f, "'{s}' is larger than the largest accepted amount, {LIMIT}")
            }
        }
    }
}

impl std::error::Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_suffix("XAF")
            .or_else(|| trimmed.strip_suffix("FCFA"))
            .unwrap_or(trimmed);

        // Drop grouping separators: spaces (including the no-break kinds) and underscores
        let compact: String = trimmed
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\u{202f}' && *c != '\u{a0}' && *c != '_')
            .collect();

        if compact.is_empty() {
            return Err(AmountError::Empty);
        }

        let invalid = || AmountError::Invalid(s.trim().to_string());

        // A single comma with no dot is a decimal comma when one or two digits follow it, e.g.
        // "12,50". "1,250" could be either reading and is refused. Otherwise commas group.
        let normalized = match compact.split_once(',') {
            Some((_, fraction)) if !compact.contains('.') && !fraction.contains(',') => {
                if !(1..=2).contains(&fraction.len()) {
                    return Err(invalid());
                }
                compact.replace(',', ".")
            }
            _ => compact.replace(',', ""),
        };

        let value = Decimal::from_str(&normalized).map_err(|_| invalid())?;
        within_limit(value, || s.trim().to_string())
    }
}

fn within_limit(value: Decimal, raw: impl FnOnce() -> String) -> Result<Amount, AmountError> {
    if value.abs() > Decimal::from(LIMIT) {
        return Err(AmountError::TooLarge(raw()));
    }
    Ok(Amount(value))
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0.normalize(), f)
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Serialized as a JSON number so that payloads read naturally to people and to models.
impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Amount::try_from_f64(n).map_err(serde::de::Error::custom),
            Raw::Text(s) => Amount::from_str(&s).map_err(serde::de::Error::custom),
        }
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_plain() {
        assert_eq!(amt("50").value(), Decimal::from(50));
        assert_eq!(amt("50.25").value(), Decimal::from_str("50.25").unwrap());
    }

    #[test]
    fn test_parse_locale_formatted() {
        assert_eq!(amt("1 234 567 XAF").value(), Decimal::from(1_234_567));
        assert_eq!(
            amt("1\u{202f}234,50 XAF").value(),
            Decimal::from_str("1234.50").unwrap()
        );
    }

    #[test]
    fn test_parse_commas_as_grouping() {
        assert_eq!(amt("1,000,000").value(), Decimal::from(1_000_000));
        assert_eq!(
            amt("1,000.75").value(),
            Decimal::from_str("1000.75").unwrap()
        );
    }

    #[test]
    fn test_parse_ambiguous_comma() {
        assert_eq!(amt("12,5").value(), Decimal::from_str("12.5").unwrap());
        assert!(matches!(
            Amount::from_str("1,250"),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            Amount::from_str("1,2500"),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(Amount::from_str("12,"), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn test_parse_rejects_huge_amounts() {
        assert_eq!(
            amt("1 000 000 000 000 000").value(),
            Decimal::from(LIMIT)
        );
        assert!(matches!(
            Amount::from_str("50000000000000000000000000000"),
            Err(AmountError::TooLarge(_))
        ));
        assert!(matches!(
            Amount::from_str("-1000000000000001"),
            Err(AmountError::TooLarge(_))
        ));
        assert!(matches!(
            Amount::try_from_f64(1e20),
            Err(AmountError::TooLarge(_))
        ));
    }

    #[test]
    fn test_sum_saturates() {
        let huge = Amount::new(Decimal::MAX);
        let total: Amount = vec![huge, huge, amt("1")].into_iter().sum();
        assert_eq!(total.value(), Decimal::MAX);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(Amount::from_str("  "), Err(AmountError::Empty));
        assert!(matches!(
            Amount::from_str("NaN"),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(
            Amount::from_str("twelve"),
            Err(AmountError::Invalid(_))
        ));
    }

    #[test]
    fn test_try_from_f64_rejects_non_finite() {
        assert!(Amount::try_from_f64(f64::NAN).is_err());
        assert!(Amount::try_from_f64(f64::INFINITY).is_err());
        assert_eq!(Amount::try_from_f64(12.5).unwrap(), amt("12.5"));
    }

    #[test]
    fn test_is_positive() {
        assert!(amt("0.01").is_positive());
        assert!(!amt("0").is_positive());
        assert!(!amt("-3").is_positive());
    }

    #[test]
    fn test_sum() {
        let total: Amount = vec![amt("100"), amt("50.50"), amt("0.25")].into_iter().sum();
        assert_eq!(total, amt("150.75"));
        let empty: Amount = Vec::<Amount>::new().into_iter().sum();
        assert!(empty.is_zero());
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&amt("1500.5")).unwrap();
        assert_eq!(json, "1500.5");
    }

    #[test]
    fn test_deserialize_number_or_string() {
        let a: Amount = serde_json::from_str("250").unwrap();
        let b: Amount = serde_json::from_str("\"250\"").unwrap();
        assert_eq!(a, b);
    }
}
