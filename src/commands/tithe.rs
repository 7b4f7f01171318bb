//! Tithe command handlers.

use crate::args::{AddTitheArgs, ListArgs, UpdateTitheArgs};
use crate::commands::{invalid, list_records, Context, Out};
use crate::error::{ErrorType, IntoResult};
use crate::model::{Collection, NewRecord, Record, RecordPatch, TitheForm, TitheRecord};
use crate::Result;
use anyhow::anyhow;

/// Validates the tithe form and records it. Returns the new record's id.
///
/// # Errors
/// - A `Validation` error listing every invalid field. Nothing is written in that case.
/// - A `Store` error if the record store rejects the write.
pub async fn add_tithe(ctx: &Context, args: AddTitheArgs) -> Result<Out<String>> {
    let form = TitheForm {
        member_name: args.member_name,
        date: args.date,
        amount: args.amount,
    };
    let tithe = invalid(form.validate(ctx.today()))?;
    let summary = format!(
        "{} from {} on {}",
        ctx.currency().with_decimals(tithe.amount),
        tithe.member_name,
        tithe.date
    );
    let id = ctx
        .store()
        .create(NewRecord::Tithe(tithe), &ctx.session().user_id)
        .await
        .pub_result(ErrorType::Store)?;
    Ok(Out::new(format!("Recorded a tithe of {summary} as {id}"), id))
}

/// Lists tithes, newest first.
pub async fn list_tithes(ctx: &Context, args: &ListArgs) -> Result<Out<Vec<TitheRecord>>> {
    list_records(ctx, Collection::Tithes, args, |record| match record {
        Record::Tithe(r) => Some(r),
        _ => None,
    })
    .await
}

/// Changes the fields given in `args`. The others keep their values.
///
/// # Errors
/// - A `Validation` error if a given field is invalid or no field is given.
/// - A `Store` error if there is no tithe with the id.
pub async fn update_tithe(ctx: &Context, args: UpdateTitheArgs) -> Result<Out<String>> {
    let form = TitheForm {
        member_name: args.member_name,
        date: args.date,
        amount: args.amount,
    };
    let patch = invalid(form.validate_patch(ctx.today()))?;
    if patch.is_empty() {
        return Err(anyhow!(
            "Nothing to update. Pass at least one of --member-name, --date or --amount."
        ))
        .pub_result(ErrorType::Validation);
    }
    ctx.store()
        .update(&args.id, RecordPatch::Tithe(patch))
        .await
        .pub_result(ErrorType::Store)?;
    Ok(Out::new(format!("Updated tithe {}", args.id), args.id))
}
