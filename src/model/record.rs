//! The three kinds of financial record and the tagged types used to move them in and out of a
//! record store.

use crate::model::{Amount, ExpenseCategory, IncomeCategory, PaymentMethod};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The collections held by a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "income_records")]
    Income,
    #[serde(rename = "tithe_records")]
    Tithes,
    #[serde(rename = "expense_records")]
    Expenses,
}

serde_plain::derive_display_from_serialize!(Collection);
serde_plain::derive_fromstr_from_deserialize!(Collection);

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Income, Collection::Tithes, Collection::Expenses];

    /// The collection (or table) name in the store.
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Income => "income_records",
            Collection::Tithes => "tithe_records",
            Collection::Expenses => "expense_records",
        }
    }
}

/// An offering, donation or other gift, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeRecord {
    pub id: String,
    pub date: NaiveDate,
    pub category: IncomeCategory,
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    pub recorded_by_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A tithe given by a member, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitheRecord {
    pub id: String,
    pub member_name: String,
    pub date: NaiveDate,
    pub amount: Amount,
    pub recorded_by_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Money spent by the church, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRecord {
    pub id: String,
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub recorded_by_user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The fields of an income record that a person supplies. The store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIncome {
    pub date: NaiveDate,
    pub category: IncomeCategory,
    pub amount: Amount,
    pub description: Option<String>,
    pub member_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTithe {
    pub member_name: String,
    pub date: NaiveDate,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    pub date: NaiveDate,
    pub category: ExpenseCategory,
    pub amount: Amount,
    pub payee: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
}

/// Changes to a tithe record. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TithePatch {
    pub member_name: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Option<Amount>,
}

/// Changes to an expense record. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpensePatch {
    pub date: Option<NaiveDate>,
    pub category: Option<ExpenseCategory>,
    pub amount: Option<Amount>,
    pub payee: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub description: Option<String>,
}

impl TithePatch {
    pub fn is_empty(&self) -> bool {
        self.member_name.is_none() && self.date.is_none() && self.amount.is_none()
    }
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.category.is_none()
            && self.amount.is_none()
            && self.payee.is_none()
            && self.payment_method.is_none()
            && self.description.is_none()
    }
}

/// A stored record of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Income(IncomeRecord),
    Tithe(TitheRecord),
    Expense(ExpenseRecord),
}

impl Record {
    pub fn id(&self) -> &str {
        match self {
            Record::Income(r) => &r.id,
            Record::Tithe(r) => &r.id,
            Record::Expense(r) => &r.id,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            Record::Income(_) => Collection::Income,
            Record::Tithe(_) => Collection::Tithes,
            Record::Expense(_) => Collection::Expenses,
        }
    }
}

/// A record to be created, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NewRecord {
    Income(NewIncome),
    Tithe(NewTithe),
    Expense(NewExpense),
}

impl NewRecord {
    pub fn collection(&self) -> Collection {
        match self {
            NewRecord::Income(_) => Collection::Income,
            NewRecord::Tithe(_) => Collection::Tithes,
            NewRecord::Expense(_) => Collection::Expenses,
        }
    }
}

/// An update to a stored record. Income records cannot be edited, only deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordPatch {
    Tithe(TithePatch),
    Expense(ExpensePatch),
}

impl RecordPatch {
    pub fn collection(&self) -> Collection {
        match self {
            RecordPatch::Tithe(_) => Collection::Tithes,
            RecordPatch::Expense(_) => Collection::Expenses,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RecordPatch::Tithe(p) => p.is_empty(),
            RecordPatch::Expense(p) => p.is_empty(),
        }
    }
}

/// The in-memory records that dashboards and reports are computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub income: Vec<IncomeRecord>,
    pub tithes: Vec<TitheRecord>,
    pub expenses: Vec<ExpenseRecord>,
}

impl Ledger {
    /// Sorts stored records into their collections.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut ledger = Ledger::default();
        for record in records {
            match record {
                Record::Income(r) => ledger.income.push(r),
                Record::Tithe(r) => ledger.tithes.push(r),
                Record::Expense(r) => ledger.expenses.push(r),
            }
        }
        ledger
    }

    pub fn is_empty(&self) -> bool {
        self.income.is_empty() && self.tithes.is_empty() && self.expenses.is_empty()
    }
}
