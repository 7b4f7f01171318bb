//! Income command handlers. Income records can be added, listed and deleted but not edited.

use crate::args::{AddIncomeArgs, ListArgs};
use crate::commands::{invalid, list_records, Context, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Collection, IncomeForm, IncomeRecord, NewRecord, Record};
use crate::Result;

impl From<AddIncomeArgs> for IncomeForm {
    fn from(args: AddIncomeArgs) -> Self {
        IncomeForm {
            date: args.date,
            category: args.category,
            amount: args.amount,
            description: args.description,
            member_name: args.member_name,
        }
    }
}

/// Validates the income form and records it, attributed to the signed-in user. Returns the new
/// record's id.
///
/// # Errors
/// - A `Validation` error listing every invalid field. Nothing is written in that case.
/// - A `Store` error if the record store rejects the write.
pub async fn add_income(ctx: &Context, args: AddIncomeArgs) -> Result<Out<String>> {
    let income = invalid(IncomeForm::from(args).validate(ctx.today()))?;
    let summary = format!(
        "{} {} on {}",
        income.category,
        ctx.currency().with_decimals(income.amount),
        income.date
    );
    let id = ctx
        .store()
        .create(NewRecord::Income(income), &ctx.session().user_id)
        .await
        .pub_result(ErrorType::Store)?;
    Ok(Out::new(format!("Recorded {summary} as {id}"), id))
}

/// Lists income records, newest first.
pub async fn list_income(ctx: &Context, args: &ListArgs) -> Result<Out<Vec<IncomeRecord>>> {
    list_records(ctx, Collection::Income, args, |record| match record {
        Record::Income(r) => Some(r),
        _ => None,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::context;
    use crate::commands::{delete_record, OutputFormat};
    use crate::error::error_type;
    use crate::model::{Amount, IncomeCategory};
    use crate::test::{TestEnv, TEST_EMAIL};
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn offering(date: &str, amount: &str) -> AddIncomeArgs {
        AddIncomeArgs {
            date: Some(date.to_string()),
            category: Some("Offering".to_string()),
            amount: Some(amount.to_string()),
            ..AddIncomeArgs::default()
        }
    }

    #[tokio::test]
    async fn test_add_and_list_income() {
        let env = TestEnv::new().await;
        let ctx = context(&env).with_today(today());

        let out = add_income(&ctx, offering("2024-06-02", "15 000")).await.unwrap();
        let id = out.structure().unwrap().clone();
        assert!(out.message().starts_with("Recorded Offering 15\u{202f}000,00 XAF on 2024-06-02"));
        add_income(&ctx, offering("2024-05-26", "12500")).await.unwrap();

        let out = list_income(&ctx, &ListArgs::default()).await.unwrap();
        let records = out.structure().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].category, IncomeCategory::Offering);
        assert_eq!(records[0].amount, Amount::from_str("15000").unwrap());
        assert_eq!(records[0].recorded_by_user_id, TEST_EMAIL);
        assert!(records[0].created_at.is_some());
        assert!(out.body().unwrap().contains("| Offering |"));

        let args = ListArgs {
            from: NaiveDate::from_ymd_opt(2024, 6, 1),
            format: OutputFormat::Csv,
            ..ListArgs::default()
        };
        let out = list_income(&ctx, &args).await.unwrap();
        assert_eq!(out.structure().unwrap().len(), 1);
        assert!(out.body().unwrap().starts_with("ID,Date,Category,Amount"));
    }

    #[tokio::test]
    async fn test_tithe_income_without_member_never_reaches_store() {
        let env = TestEnv::new().await;
        let ctx = context(&env).with_today(today());
        let args = AddIncomeArgs {
            date: Some("2024-06-09".to_string()),
            category: Some("Tithe".to_string()),
            amount: Some("5000".to_string()),
            ..AddIncomeArgs::default()
        };
        let err = add_income(&ctx, args).await.unwrap_err();
        assert_eq!(error_type(&err), Some(ErrorType::Validation));
        assert!(err.to_string().contains("Member name is required for tithes."));

        let out = list_income(&ctx, &ListArgs::default()).await.unwrap();
        assert!(out.structure().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_future_income_is_rejected() {
        let env = TestEnv::new().await;
        let ctx = context(&env).with_today(today());
        let err = add_income(&ctx, offering("2024-06-16", "100")).await.unwrap_err();
        assert!(err.to_string().contains("Date cannot be in the future."));
    }

    #[tokio::test]
    async fn test_delete_income() {
        let env = TestEnv::new().await;
        let ctx = context(&env).with_today(today());
        let id = add_income(&ctx, offering("2024-06-02", "100"))
            .await
            .unwrap()
            .structure()
            .unwrap()
            .clone();
        delete_record(&ctx, Collection::Income, &id).await.unwrap();
        let out = list_income(&ctx, &ListArgs::default()).await.unwrap();
        assert!(out.structure().unwrap().is_empty());
        assert!(delete_record(&ctx, Collection::Income, &id).await.is_err());
    }
}
