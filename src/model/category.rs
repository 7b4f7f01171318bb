//! The fixed enumerations that classify records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Classification of a generic income record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum IncomeCategory {
    Offering,
    Tithe,
    Donation,
    Other,
}

serde_plain::derive_display_from_serialize!(IncomeCategory);
serde_plain::derive_fromstr_from_deserialize!(IncomeCategory);

impl IncomeCategory {
    pub const ALL: [IncomeCategory; 4] = [
        IncomeCategory::Offering,
        IncomeCategory::Tithe,
        IncomeCategory::Donation,
        IncomeCategory::Other,
    ];
}

/// Classification of an expense record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum ExpenseCategory {
    Utilities,
    Salaries,
    Rent,
    Maintenance,
    Missions,
    Outreach,
    Supplies,
    Events,
    Transport,
    Other,
}

serde_plain::derive_display_from_serialize!(ExpenseCategory);
serde_plain::derive_fromstr_from_deserialize!(ExpenseCategory);

impl ExpenseCategory {
    pub const ALL: [ExpenseCategory; 10] = [
        ExpenseCategory::Utilities,
        ExpenseCategory::Salaries,
        ExpenseCategory::Rent,
        ExpenseCategory::Maintenance,
        ExpenseCategory::Missions,
        ExpenseCategory::Outreach,
        ExpenseCategory::Supplies,
        ExpenseCategory::Events,
        ExpenseCategory::Transport,
        ExpenseCategory::Other,
    ];
}

/// How an expense was paid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum PaymentMethod {
    Cash,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Mobile Money")]
    MobileMoney,
    Cheque,
    Other,
}

serde_plain::derive_display_from_serialize!(PaymentMethod);
serde_plain::derive_fromstr_from_deserialize!(PaymentMethod);

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::BankTransfer,
        PaymentMethod::MobileMoney,
        PaymentMethod::Cheque,
        PaymentMethod::Other,
    ];
}

/// Lists the allowed values of an enumeration for error messages, e.g. `Cash, Cheque`.
pub(crate) fn choices<T: ToString>(all: &[T]) -> String {
    all.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
