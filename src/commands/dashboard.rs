//! The dashboard: headline totals, the last six months and where income comes from.

use crate::aggregate::{monthly_series, BreakdownRow, DateRange, IncomeSummary, MonthBucket};
use crate::api::{fetch_ledger, Filter};
use crate::args::DashboardArgs;
use crate::commands::{Context, Out};
use crate::currency::CurrencyFormatter;
use crate::error::{ErrorType, IntoResult};
use crate::model::{earliest_date, Amount};
use crate::Result;
use serde::Serialize;
use std::fmt::Write;

/// How many months the income and expense chart covers.
const CHART_MONTHS: u32 = 6;

/// One headline figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatCard {
    pub title: &'static str,
    pub value: Amount,
    /// `value` formatted in whole currency units.
    pub display: String,
    pub description: &'static str,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// The period the totals cover. `None` means all records.
    pub period: Option<DateRange>,
    pub summary: IncomeSummary,
    pub cards: Vec<StatCard>,
    /// Oldest month first, ending with the current month.
    pub monthly: Vec<MonthBucket>,
    pub breakdown: Vec<BreakdownRow>,
}

impl Dashboard {
    /// Builds the dashboard from every record of the three collections. The totals are limited
    /// to `period` when one is given; the monthly chart always ends with the month of `today`.
    pub fn build(
        ledger: &crate::model::Ledger,
        period: Option<DateRange>,
        today: chrono::NaiveDate,
        currency: &CurrencyFormatter,
    ) -> Self {
        let summary = IncomeSummary::from_ledger(ledger, period.as_ref());
        let card = |title, value: Amount, description| StatCard {
            title,
            value,
            display: currency.whole(value),
            description,
        };
        let cards = vec![
            card(
                "Total Offerings",
                summary.total_offerings,
                "All offerings received",
            ),
            card("Total Tithes", summary.total_tithes, "Tithes from members"),
            card(
                "Other Income",
                summary.other_income,
                "Donations, events, etc.",
            ),
            card(
                "Total Income",
                summary.total_income,
                "Offerings, tithes and other income",
            ),
            card(
                "Total Expenses",
                summary.total_expenses,
                "All recorded expenses",
            ),
        ];
        Self {
            period,
            summary,
            cards,
            monthly: monthly_series(ledger, CHART_MONTHS, today),
            breakdown: summary.breakdown(),
        }
    }

    /// The dashboard as text.
    pub fn render(&self, currency: &CurrencyFormatter) -> String {
        let mut out = String::new();
        match self.period {
            Some(period) => {
                let _ = writeln!(out, "From {} to {}\n", period.start(), period.end());
            }
            None => out.push_str("All records\n\n"),
        }

        let title_width = self.cards.iter().map(|c| c.title.len()).max().unwrap_or(0);
        let value_width = self
            .cards
            .iter()
            .map(|c| c.display.chars().count())
            .max()
            .unwrap_or(0);
        for card in &self.cards {
            let pad = value_width - card.display.chars().count();
            let _ = writeln!(
                out,
                "{:<title_width$}  {}{}  {}",
                card.title,
                " ".repeat(pad),
                card.display,
                card.description
            );
        }

        let _ = writeln!(
            out,
            "\nIncome vs Expenses Overview (last {CHART_MONTHS} months)"
        );
        for bucket in &self.monthly {
            let _ = writeln!(
                out,
                "{} {}  income {:>12}  expenses {:>12}",
                bucket.label(),
                bucket.month.format("%Y"),
                currency.thousands(bucket.income),
                currency.thousands(bucket.expenses)
            );
        }

        out.push_str("\nIncome Breakdown\n");
        for row in &self.breakdown {
            let _ = writeln!(out, "{:<9}  {}", row.name, currency.whole(row.value));
        }
        out.trim_end().to_string()
    }
}

/// Handles `churchbooks dashboard`.
///
/// # Errors
/// A `Store` error if the records cannot be fetched.
pub async fn dashboard(ctx: &Context, args: &DashboardArgs) -> Result<Out<Dashboard>> {
    let ledger = fetch_ledger(ctx.store(), &Filter::all())
        .await
        .pub_result(ErrorType::Store)?;
    let period = match (args.from, args.to) {
        (None, None) => None,
        (from, to) => Some(DateRange::new(
            from.unwrap_or_else(earliest_date),
            to.unwrap_or(ctx.today()),
        )),
    };
    let dashboard = Dashboard::build(&ledger, period, ctx.today(), ctx.currency());
    let body = dashboard.render(ctx.currency());
    Ok(Out::new(
        format!("Welcome, {}", ctx.session().name()),
        dashboard,
    )
    .with_body(body))
}
