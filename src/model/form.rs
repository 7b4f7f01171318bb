//! Form values as a person enters them, and the validation that turns them into records.
//!
//! Every rule is checked and every failure is reported, field by field, so the person can fix the
//! whole form at once. Nothing reaches a record store until validation passes.

use crate::model::{
    choices, Amount, ExpenseCategory, ExpensePatch, IncomeCategory, NewExpense, NewIncome,
    NewTithe, PaymentMethod, TithePatch,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The earliest date a record may carry.
pub fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN)
}

const MIN_MEMBER_NAME: usize = 2;

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All of the problems found in a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// The message for `field`, if it failed.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// The income entry form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeForm {
    pub date: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub description: Option<String>,
    pub member_name: Option<String>,
}

impl IncomeForm {
    pub fn validate(&self, today: NaiveDate) -> Result<NewIncome, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let date = check_date(&mut errors, self.date.as_deref(), today);
        let category = check_enum::<IncomeCategory>(
            &mut errors,
            "category",
            self.category.as_deref(),
            &IncomeCategory::ALL,
            true,
        );
        let amount = check_amount(&mut errors, self.amount.as_deref());
        let member_name = non_blank(self.member_name.as_deref());
        if category == Some(IncomeCategory::Tithe) && member_name.is_none() {
            errors.push("member_name", "Member name is required for tithes.");
        }

        errors.into_result(|| NewIncome {
            date: date.unwrap_or(today),
            category: category.unwrap_or(IncomeCategory::Other),
            amount: amount.unwrap_or_default(),
            description: non_blank(self.description.as_deref()),
            member_name,
        })
    }
}

/// The tithe entry and edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitheForm {
    pub member_name: Option<String>,
    pub date: Option<String>,
    pub amount: Option<String>,
}

impl TitheForm {
    pub fn validate(&self, today: NaiveDate) -> Result<NewTithe, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let member_name = check_member_name(&mut errors, self.member_name.as_deref(), true);
        let date = check_date(&mut errors, self.date.as_deref(), today);
        let amount = check_amount(&mut errors, self.amount.as_deref());
        errors.into_result(|| NewTithe {
            member_name: member_name.unwrap_or_default(),
            date: date.unwrap_or(today),
            amount: amount.unwrap_or_default(),
        })
    }

    /// Validates only the fields that were supplied, for an edit.
    pub fn validate_patch(&self, today: NaiveDate) -> Result<TithePatch, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let member_name = check_member_name(&mut errors, self.member_name.as_deref(), false);
        let date = self
            .date
            .as_deref()
            .and_then(|d| check_date(&mut errors, Some(d), today));
        let amount = self
            .amount
            .as_deref()
            .and_then(|a| check_amount(&mut errors, Some(a)));
        errors.into_result(|| TithePatch {
            member_name,
            date,
            amount,
        })
    }
}

/// The expense entry and edit form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseForm {
    pub date: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub payee: Option<String>,
    pub payment_method: Option<String>,
    pub description: Option<String>,
}

impl ExpenseForm {
    pub fn validate(&self, today: NaiveDate) -> Result<NewExpense, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let date = check_date(&mut errors, self.date.as_deref(), today);
        let category = check_enum::<ExpenseCategory>(
            &mut errors,
            "category",
            self.category.as_deref(),
            &ExpenseCategory::ALL,
            true,
        );
        let amount = check_amount(&mut errors, self.amount.as_deref());
        let payment_method = check_enum::<PaymentMethod>(
            &mut errors,
            "payment_method",
            self.payment_method.as_deref(),
            &PaymentMethod::ALL,
            false,
        );
        errors.into_result(|| NewExpense {
            date: date.unwrap_or(today),
            category: category.unwrap_or(ExpenseCategory::Other),
            amount: amount.unwrap_or_default(),
            payee: non_blank(self.payee.as_deref()),
            payment_method,
            description: non_blank(self.description.as_deref()),
        })
    }

    /// Validates only the fields that were supplied, for an edit.
    pub fn validate_patch(&self, today: NaiveDate) -> Result<ExpensePatch, ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let date = self
            .date
            .as_deref()
            .and_then(|d| check_date(&mut errors, Some(d), today));
        let category = check_enum::<ExpenseCategory>(
            &mut errors,
            "category",
            self.category.as_deref(),
            &ExpenseCategory::ALL,
            false,
        );
        let amount = self
            .amount
            .as_deref()
            .and_then(|a| check_amount(&mut errors, Some(a)));
        let payment_method = check_enum::<PaymentMethod>(
            &mut errors,
            "payment_method",
            self.payment_method.as_deref(),
            &PaymentMethod::ALL,
            false,
        );
        errors.into_result(|| ExpensePatch {
            date,
            category,
            amount,
            payee: non_blank(self.payee.as_deref()),
            payment_method,
            description: non_blank(self.description.as_deref()),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// A missing date means today, as the entry forms default to it.
fn check_date(
    errors: &mut ValidationErrors,
    value: Option<&str>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let Some(raw) = non_blank(value) else {
        return Some(today);
    };
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Err(_) => {
            errors.push("date", format!("'{raw}' is not a date, expected YYYY-MM-DD."));
            None
        }
        Ok(date) if date > today => {
            errors.push("date", "Date cannot be in the future.");
            None
        }
        Ok(date) if date < earliest_date() => {
            errors.push("date", "Date cannot be before 1900-01-01.");
            None
        }
        Ok(date) => Some(date),
    }
}

fn check_amount(errors: &mut ValidationErrors, value: Option<&str>) -> Option<Amount> {
    let Some(raw) = non_blank(value) else {
        errors.push("amount", "Amount is required.");
        return None;
    };
    match Amount::from_str(&raw) {
        Ok(amount) if amount.is_positive() => Some(amount),
        Ok(_) => {
            errors.push("amount", "Amount must be positive.");
            None
        }
        Err(e) => {
            errors.push("amount", format!("{e}."));
            None
        }
    }
}

fn check_enum<T>(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: Option<&str>,
    all: &[T],
    required: bool,
) -> Option<T>
where
    T: FromStr + ToString,
{
    let Some(raw) = non_blank(value) else {
        if required {
            errors.push(field, "Category is required.");
        }
        return None;
    };
    match T::from_str(&raw) {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(
                field,
                format!("'{raw}' is not one of: {}.", choices(all)),
            );
            None
        }
    }
}

fn check_member_name(
    errors: &mut ValidationErrors,
    value: Option<&str>,
    required: bool,
) -> Option<String> {
    match non_blank(value) {
        None if required => {
            errors.push("member_name", "Member name is required.");
            None
        }
        None => None,
        Some(name) if name.chars().count() < MIN_MEMBER_NAME => {
            errors.push(
                "member_name",
                "Member name must be at least 2 characters.",
            );
            None
        }
        Some(name) => Some(name),
    }
}
