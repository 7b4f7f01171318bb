//! Types that represent the core data model: records, their categories, amounts and the forms
//! people fill in to create them.
mod amount;
mod category;
mod form;
mod record;

pub use amount::{Amount, AmountError};
pub use category::{ExpenseCategory, IncomeCategory, PaymentMethod};
pub use form::{
    earliest_date, ExpenseForm, FieldError, IncomeForm, TitheForm, ValidationErrors,
};
pub use record::{
    Collection, ExpensePatch, ExpenseRecord, IncomeRecord, Ledger, NewExpense, NewIncome,
    NewRecord, NewTithe, Record, RecordPatch, TithePatch, TitheRecord,
};

pub(crate) use category::choices;
