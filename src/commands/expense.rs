//! Expense command handlers.

use crate::args::{AddExpenseArgs, ListArgs, UpdateExpenseArgs};
use crate::commands::{invalid, list_records, Context, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Collection, ExpenseForm, ExpenseRecord, NewRecord, Record, RecordPatch};
use crate::Result;
use anyhow::anyhow;

impl From<AddExpenseArgs> for ExpenseForm {
    fn from(args: AddExpenseArgs) -> Self {
        ExpenseForm {
            date: args.date,
            category: args.category,
            amount: args.amount,
            payee: args.payee,
            payment_method: args.payment_method,
            description: args.description,
        }
    }
}

/// Validates the expense form and records it. Returns the new record's id.
///
/// # Errors
/// - A `Validation` error listing every invalid field. Nothing is written in that case.
/// - A `Store` error if the record store rejects the write.
pub async fn add_expense(ctx: &Context, args: AddExpenseArgs) -> Result<Out<String>> {
    let expense = invalid(ExpenseForm::from(args).validate(ctx.today()))?;
    let summary = format!(
        "{} for {} on {}",
        ctx.currency().with_decimals(expense.amount),
        expense.category,
        expense.date
    );
    let id = ctx
        .store()
        .create(NewRecord::Expense(expense), &ctx.session().user_id)
        .await
        .pub_result(ErrorType::Store)?;
    Ok(Out::new(format!("Recorded {summary} as {id}"), id))
}

/// Lists expenses, newest first.
pub async fn list_expenses(ctx: &Context, args: &ListArgs) -> Result<Out<Vec<ExpenseRecord>>> {
    list_records(ctx, Collection::Expenses, args, |record| match record {
        Record::Expense(r) => Some(r),
        _ => None,
    })
    .await
}

/// Changes the fields given in `args`. The others keep their values.
///
/// # Errors
/// - A `Validation` error if a given field is invalid or no field is given.
/// - A `Store` error if there is no expense with the id.
pub async fn update_expense(ctx: &Context, args: UpdateExpenseArgs) -> Result<Out<String>> {
    let id = args.id;
    let form = ExpenseForm {
        date: args.date,
        category: args.category,
        amount: args.amount,
        payee: args.payee,
        payment_method: args.payment_method,
        description: args.description,
    };
    let patch = invalid(form.validate_patch(ctx.today()))?;
    if patch.is_empty() {
        return Err(anyhow!(
            "Nothing to update. Pass at least one of --date, --category, --amount, --payee, \
            --payment-method or --description."
        ))
        .pub_result(ErrorType::Validation);
    }
    ctx.store()
        .update(&id, RecordPatch::Expense(patch))
        .await
        .pub_result(ErrorType::Store)?;
    Ok(Out::new(format!("Updated expense {id}"), id))
}
