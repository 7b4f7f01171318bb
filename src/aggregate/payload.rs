use super::{category_totals, monthly_series, DateRange, IncomeSummary};
use crate::model::{Amount, IncomeCategory, Ledger};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of whole months summarized by a quarterly report.
const QUARTER_MONTHS: u32 = 3;

/// Number of months covered by a trend report.
const TREND_MONTHS: u32 = 12;

/// Aggregated data that is sent to the report generator.
pub trait Payload: Serialize {
    /// True when there is nothing worth reporting on.
    fn is_empty(&self) -> bool;
}

/// Income for the quarter, split the way the report describes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterlyIncome {
    pub offerings: Amount,
    pub tithes: Amount,
    pub donations: Amount,
    pub other: Amount,
}

/// The last three full calendar months, summarized for a quarterly report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterlyData {
    pub quarter: String,
    pub income: QuarterlyIncome,
    /// Only categories that have expenses in the quarter appear.
    pub expenses: BTreeMap<String, Amount>,
    pub summary_notes: String,
}

impl QuarterlyData {
    /// The months a quarterly report made on `today` covers.
    pub fn range(today: NaiveDate) -> DateRange {
        DateRange::previous_full_months(QUARTER_MONTHS, today)
    }

    pub fn from_ledger(ledger: &Ledger, today: NaiveDate) -> Self {
        let range = Self::range(today);
        let (start, end) = (range.start(), range.end());

        let mut income = QuarterlyIncome {
            tithes: IncomeSummary::from_ledger(ledger, Some(&range)).total_tithes,
            ..QuarterlyIncome::default()
        };
        for record in ledger.income.iter().filter(|r| range.contains(r.date)) {
            match record.category {
                IncomeCategory::Offering => income.offerings += record.amount,
                IncomeCategory::Donation => income.donations += record.amount,
                IncomeCategory::Other => income.other += record.amount,
                IncomeCategory::Tithe => {}
            }
        }

        let quarter = format!(
            "Q{} {} (Data from {} to {})",
            end.month0() / 3 + 1,
            end.year(),
            start.format("%b %Y"),
            end.format("%b %Y"),
        );
        let summary_notes = format!(
            "Report generated on {}. Data reflects records from {} to {}.",
            long_date(today),
            medium_date(start),
            medium_date(end),
        );

        Self {
            quarter,
            income,
            expenses: category_totals(&ledger.expenses, &range),
            summary_notes,
        }
    }
}

impl Payload for QuarterlyData {
    fn is_empty(&self) -> bool {
        self.income == QuarterlyIncome::default() && self.expenses.is_empty()
    }
}

/// Totals for one month of a trend report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendMonth {
    /// `yyyy-MM`
    pub month: String,
    pub income: Amount,
    pub expenses: Amount,
}

/// Twelve months of income and expenses, oldest first, ending with the current month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendData {
    pub monthly_records: Vec<TrendMonth>,
}

impl TrendData {
    /// The months a trend report made on `today` covers.
    pub fn range(today: NaiveDate) -> DateRange {
        DateRange::trailing_months(TREND_MONTHS, today)
    }

    pub fn from_ledger(ledger: &Ledger, today: NaiveDate) -> Self {
        let monthly_records = monthly_series(ledger, TREND_MONTHS, today)
            .into_iter()
            .map(|bucket| TrendMonth {
                month: bucket.key(),
                income: bucket.income,
                expenses: bucket.expenses,
            })
            .collect();
        Self { monthly_records }
    }
}

impl Payload for TrendData {
    fn is_empty(&self) -> bool {
        self.monthly_records
            .iter()
            .all(|m| m.income.is_zero() && m.expenses.is_zero())
    }
}

/// e.g. `June 15th, 2024`
fn long_date(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{} {day}{suffix}, {}", date.format("%B"), date.year())
}

/// e.g. `Jun 15, 2024`
fn medium_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::{amt, date, expense, income, sample_ledger, tithe};
    use crate::model::ExpenseCategory;

    #[test]
    fn test_quarterly_data() {
        let ledger = sample_ledger();
        let data = QuarterlyData::from_ledger(&ledger, date("2024-06-15"));
        assert_eq!(data.quarter, "Q2 2024 (Data from Mar 2024 to May 2024)");
        assert_eq!(
            data.summary_notes,
            "Report generated on June 15th, 2024. Data reflects records from Mar 1, 2024 to \
             May 31, 2024."
        );
        assert_eq!(data.income.offerings, Amount::ZERO);
        assert_eq!(data.income.donations, amt("20000"));
        assert_eq!(data.income.other, amt("5000"));
        assert_eq!(data.income.tithes, amt("12500"));
        assert_eq!(data.expenses.len(), 2);
        assert_eq!(data.expenses.get("Utilities"), Some(&amt("50000")));
        assert_eq!(data.expenses.get("Rent"), Some(&amt("60000")));
        assert!(!data.is_empty());
    }

    #[test]
    fn test_quarterly_excludes_current_month() {
        let ledger = Ledger {
            income: vec![income("a", "2024-06-01", IncomeCategory::Offering, "100")],
            tithes: vec![tithe("b", "2024-06-14", "100")],
            expenses: vec![expense("c", "2024-02-29", ExpenseCategory::Rent, "10")],
        };
        let data = QuarterlyData::from_ledger(&ledger, date("2024-06-15"));
        assert!(data.is_empty());
    }

    #[test]
    fn test_quarter_label_crosses_year() {
        let data = QuarterlyData::from_ledger(&Ledger::default(), date("2024-01-20"));
        assert_eq!(data.quarter, "Q4 2023 (Data from Oct 2023 to Dec 2023)");
        assert!(data.is_empty());
    }

    #[test]
    fn test_quarterly_serialization() {
        let data = QuarterlyData::from_ledger(&sample_ledger(), date("2024-06-15"));
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["income"]["donations"], serde_json::json!(20000.0));
        assert!(value["summary_notes"].is_string());
        assert_eq!(value["expenses"]["Rent"], serde_json::json!(60000.0));
    }

    #[test]
    fn test_trend_data() {
        let data = TrendData::from_ledger(&sample_ledger(), date("2024-06-15"));
        assert_eq!(data.monthly_records.len(), 12);
        assert_eq!(data.monthly_records[0].month, "2023-07");
        assert_eq!(data.monthly_records[11].month, "2024-06");
        let march = &data.monthly_records[8];
        assert_eq!(march.month, "2024-03");
        assert_eq!(march.income, amt("30000"));
        assert_eq!(march.expenses, amt("42000"));
        assert!(!data.is_empty());
    }

    #[test]
    fn test_trend_data_empty() {
        let data = TrendData::from_ledger(&Ledger::default(), date("2024-06-15"));
        assert_eq!(data.monthly_records.len(), 12);
        assert!(data.is_empty());

        let old = Ledger {
            expenses: vec![expense("x", "2020-01-01", ExpenseCategory::Other, "5")],
            ..Ledger::default()
        };
        assert!(TrendData::from_ledger(&old, date("2024-06-15")).is_empty());
    }

    #[test]
    fn test_long_date() {
        assert_eq!(long_date(date("2024-06-01")), "June 1st, 2024");
        assert_eq!(long_date(date("2024-06-02")), "June 2nd, 2024");
        assert_eq!(long_date(date("2024-06-03")), "June 3rd, 2024");
        assert_eq!(long_date(date("2024-06-11")), "June 11th, 2024");
        assert_eq!(long_date(date("2024-06-22")), "June 22nd, 2024");
        assert_eq!(medium_date(date("2024-06-05")), "Jun 5, 2024");
    }
}
