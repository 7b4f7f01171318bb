//! Derives totals, category subtotals and monthly series from in-memory records.
//!
//! Everything here is a pure function of its inputs. "Today" is always passed in so that the same
//! records give the same answer no matter when they are aggregated. Intervals are inclusive at
//! both ends and are not validated: an interval whose start is after its end matches nothing.

mod payload;

pub use payload::{Payload, QuarterlyData, QuarterlyIncome, TrendData, TrendMonth};

use crate::model::{Amount, ExpenseRecord, IncomeCategory, IncomeRecord, Ledger, TitheRecord};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The label used for records that carry no category of their own.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A dated amount that can be aggregated.
pub trait Entry {
    fn date(&self) -> NaiveDate;
    fn amount(&self) -> Amount;
    /// The category label, if the record kind has one.
    fn category(&self) -> Option<String>;
}

impl Entry for IncomeRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn amount(&self) -> Amount {
        self.amount
    }

    fn category(&self) -> Option<String> {
        Some(self.category.to_string())
    }
}

impl Entry for TitheRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn amount(&self) -> Amount {
        self.amount
    }

    fn category(&self) -> Option<String> {
        None
    }
}

impl Entry for ExpenseRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn amount(&self) -> Amount {
        self.amount
    }

    fn category(&self) -> Option<String> {
        Some(self.category.to_string())
    }
}

/// A closed interval of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// True when `date` is on or after `start` and on or before `end`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The whole calendar month that `date` falls in.
    pub fn month_of(date: NaiveDate) -> Self {
        Self::new(first_of_month(date), end_of_month(date))
    }

    /// The `months` whole calendar months ending with the month of `today`.
    pub fn trailing_months(months: u32, today: NaiveDate) -> Self {
        let start = first_of_month(months_before(today, months.saturating_sub(1)));
        let end = if months == 0 {
            start.pred_opt().unwrap_or(start)
        } else {
            end_of_month(today)
        };
        Self::new(start, end)
    }

    /// The `months` whole calendar months that precede the month of `today`.
    pub fn previous_full_months(months: u32, today: NaiveDate) -> Self {
        let start = first_of_month(months_before(today, months));
        let end = first_of_month(today).pred_opt().unwrap_or(start);
        Self::new(start, end)
    }
}

pub(crate) fn first_of_month(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

pub(crate) fn end_of_month(date: NaiveDate) -> NaiveDate {
    first_of_month(date)
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    first_of_month(date)
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

fn in_range<E: Entry>(entry: &E, range: Option<&DateRange>) -> bool {
    range.map_or(true, |r| r.contains(entry.date()))
}

/// Sums the amounts of `entries`, restricted to `range` when one is given.
pub fn total<E: Entry>(entries: &[E], range: Option<&DateRange>) -> Amount {
    entries
        .iter()
        .filter(|e| in_range(*e, range))
        .map(Entry::amount)
        .sum()
}

/// Sums amounts per category over the records whose date lies within `range`.
///
/// Only categories that actually occur are present. Records without a category are grouped
/// under `UNCATEGORIZED`.
pub fn category_totals<E: Entry>(entries: &[E], range: &DateRange) -> BTreeMap<String, Amount> {
    let mut totals = BTreeMap::new();
    for entry in entries.iter().filter(|e| range.contains(e.date())) {
        let label = entry
            .category()
            .unwrap_or_else(|| UNCATEGORIZED.to_string());
        *totals.entry(label).or_insert(Amount::ZERO) += entry.amount();
    }
    totals
}

/// Income and expenses for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthBucket {
    /// The first day of the month.
    pub month: NaiveDate,
    /// Income and tithe records together.
    pub income: Amount,
    pub expenses: Amount,
}

impl MonthBucket {
    /// Short month name, e.g. `Jan`.
    pub fn label(&self) -> String {
        self.month.format("%b").to_string()
    }

    /// Sortable month key, e.g. `2024-01`.
    pub fn key(&self) -> String {
        self.month.format("%Y-%m").to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_zero() && self.expenses.is_zero()
    }
}

/// One bucket for each of the `months` calendar months ending with the month of `today`, oldest
/// first. Months without records are present with zero totals.
pub fn monthly_series(ledger: &Ledger, months: u32, today: NaiveDate) -> Vec<MonthBucket> {
    (0..months)
        .rev()
        .map(|back| {
            let month = months_before(today, back);
            let range = DateRange::month_of(month);
            MonthBucket {
                month,
                income: total(&ledger.income, Some(&range)) + total(&ledger.tithes, Some(&range)),
                expenses: total(&ledger.expenses, Some(&range)),
            }
        })
        .collect()
}

/// The headline numbers shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSummary {
    /// Income records in the Offering category.
    pub total_offerings: Amount,
    /// Records in the tithe collection.
    pub total_tithes: Amount,
    /// Income records in the Donation and Other categories.
    pub other_income: Amount,
    pub total_income: Amount,
    pub total_expenses: Amount,
}

impl IncomeSummary {
    /// Summarizes `ledger`, restricted to `range` when one is given.
    ///
    /// Income records in the Tithe category belong to none of the three income figures; tithes
    /// are counted from the tithe collection.
    pub fn from_ledger(ledger: &Ledger, range: Option<&DateRange>) -> Self {
        let mut total_offerings = Amount::ZERO;
        let mut other_income = Amount::ZERO;
        for record in ledger.income.iter().filter(|r| in_range(*r, range)) {
            match record.category {
                IncomeCategory::Offering => total_offerings += record.amount,
                IncomeCategory::Donation | IncomeCategory::Other => other_income += record.amount,
                IncomeCategory::Tithe => {}
            }
        }
        let total_tithes = total(&ledger.tithes, range);
        Self {
            total_offerings,
            total_tithes,
            other_income,
            total_income: total_offerings + total_tithes + other_income,
            total_expenses: total(&ledger.expenses, range),
        }
    }

    /// The income breakdown as chart rows. All three rows are always present.
    pub fn breakdown(&self) -> Vec<BreakdownRow> {
        vec![
            BreakdownRow::new("Offerings", self.total_offerings),
            BreakdownRow::new("Tithes", self.total_tithes),
            BreakdownRow::new("Other", self.other_income),
        ]
    }
}

/// A named value for bar-chart rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub name: String,
    pub value: Amount,
}

impl BreakdownRow {
    pub fn new(name: impl Into<String>, value: Amount) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
