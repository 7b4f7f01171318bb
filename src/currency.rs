//! Formats amounts for display the way the church reads them: French (Cameroon) grouping with a
//! fixed currency code after the number, e.g. `1 250 000 XAF`.

use crate::model::Amount;

/// The default currency code.
pub const XAF: &str = "XAF";

/// Thousands separator used by French locales (narrow no-break space).
const GROUP_SEPARATOR: char = '\u{202f}';
const DECIMAL_SEPARATOR: char = ',';

/// Formats amounts with a fixed currency suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormatter {
    code: String,
}

impl Default for CurrencyFormatter {
    fn default() -> Self {
        Self::new(XAF)
    }
}

impl CurrencyFormatter {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Whole currency units, e.g. `1 234 XAF`. Used for totals.
    pub fn whole(&self, amount: Amount) -> String {
        format!("{} {}", localize(&format_num::format_num!(",.0f", amount.to_f64())), self.code)
    }

    /// Two decimal places, e.g. `1 234,50 XAF`. Used for individual records.
    pub fn with_decimals(&self, amount: Amount) -> String {
        format!("{} {}", localize(&format_num::format_num!(",.2f", amount.to_f64())), self.code)
    }

    /// Thousands for chart axes, e.g. `12k XAF`.
    pub fn thousands(&self, amount: Amount) -> String {
        let thousands = amount.to_f64() / 1000.0;
        format!("{}k {}", localize(&format_num::format_num!(",.0f", thousands)), self.code)
    }
}

/// Swaps the separators of an `en` formatted number for the French ones.
fn localize(en: &str) -> String {
    en.chars()
        .map(|c| match c {
            ',' => GROUP_SEPARATOR,
            '.' => DECIMAL_SEPARATOR,
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_whole() {
        let f = CurrencyFormatter::default();
        assert_eq!(f.whole(amt("0")), "0 XAF");
        assert_eq!(f.whole(amt("999")), "999 XAF");
        assert_eq!(f.whole(amt("1234567")), "1\u{202f}234\u{202f}567 XAF");
    }

    #[test]
    fn test_with_decimals() {
        let f = CurrencyFormatter::default();
        assert_eq!(f.with_decimals(amt("1234.5")), "1\u{202f}234,50 XAF");
        assert_eq!(f.with_decimals(amt("12")), "12,00 XAF");
    }

    #[test]
    fn test_thousands() {
        let f = CurrencyFormatter::default();
        assert_eq!(f.thousands(amt("12000")), "12k XAF");
        assert_eq!(f.thousands(amt("2500000")), "2\u{202f}500k XAF");
    }

    #[test]
    fn test_other_currency_code() {
        let f = CurrencyFormatter::new("EUR");
        assert_eq!(f.whole(amt("1500")), "1\u{202f}500 EUR");
    }
}
