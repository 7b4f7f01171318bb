//! Renders lists of records as a table, JSON or CSV.

use crate::currency::CurrencyFormatter;
use crate::model::{ExpenseRecord, IncomeRecord, TitheRecord};
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// How `list` commands print records.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// An aligned text table with formatted amounts.
    #[default]
    Table,
    /// A JSON array of records.
    Json,
    /// CSV with a header row and plain decimal amounts.
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

/// Records in the requested output format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    Json(serde_json::Value),
    Table(String),
    Csv(String),
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({v:?})"),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => match serde_json::to_string_pretty(v) {
                Ok(s) => write!(f, "{s}"),
                Err(_) => write!(f, "{v:?}"),
            },
            Rows::Table(s) | Rows::Csv(s) => write!(f, "{s}"),
        }
    }
}

/// A record that can be shown as one row of a table.
pub(super) trait Tabular: Serialize {
    const HEADERS: &'static [&'static str];

    /// The cells of the row. Amounts go through `amount`, so tables and CSV can show them
    /// differently.
    fn cells(&self, amount: &dyn Fn(crate::model::Amount) -> String) -> Vec<String>;
}

fn opt(value: &Option<impl ToString>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

impl Tabular for IncomeRecord {
    const HEADERS: &'static [&'static str] =
        &["ID", "Date", "Category", "Amount", "Member", "Description"];

    fn cells(&self, amount: &dyn Fn(crate::model::Amount) -> String) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.to_string(),
            self.category.to_string(),
            amount(self.amount),
            opt(&self.member_name),
            opt(&self.description),
        ]
    }
}

impl Tabular for TitheRecord {
    const HEADERS: &'static [&'static str] = &["ID", "Date", "Member", "Amount"];

    fn cells(&self, amount: &dyn Fn(crate::model::Amount) -> String) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.to_string(),
            self.member_name.clone(),
            amount(self.amount),
        ]
    }
}

impl Tabular for ExpenseRecord {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Date",
        "Category",
        "Amount",
        "Payee",
        "Payment Method",
        "Description",
    ];

    fn cells(&self, amount: &dyn Fn(crate::model::Amount) -> String) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.to_string(),
            self.category.to_string(),
            amount(self.amount),
            opt(&self.payee),
            opt(&self.payment_method),
            opt(&self.description),
        ]
    }
}

pub(super) fn render<T: Tabular>(
    records: &[T],
    format: OutputFormat,
    currency: &CurrencyFormatter,
) -> Result<Rows> {
    match format {
        OutputFormat::Json => Ok(Rows::Json(
            serde_json::to_value(records).context("Unable to serialize records")?,
        )),
        OutputFormat::Csv => to_csv(records).map(Rows::Csv),
        OutputFormat::Table => Ok(Rows::Table(to_table(records, currency))),
    }
}

fn to_csv<T: Tabular>(records: &[T]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(T::HEADERS)
        .context("Unable to write CSV header")?;
    for record in records {
        wtr.write_record(record.cells(&|a| a.to_string()))
            .context("Unable to write CSV row")?;
    }
    let bytes = wtr.into_inner().context("Unable to finish CSV output")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn to_table<T: Tabular>(records: &[T], currency: &CurrencyFormatter) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| r.cells(&|a| currency.with_decimals(a)))
        .collect();
    let headers: Vec<String> = T::HEADERS.iter().map(|h| h.to_string()).collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let pad = width - cell.chars().count();
                format!("{cell}{}", " ".repeat(pad))
            })
            .collect();
        format!("| {} |", padded.join(" | "))
    };
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = vec![line(&headers[..]), line(&rule[..])];
    out.extend(rows.iter().map(|row| line(row.as_slice())));
    out.join("\n")
}
