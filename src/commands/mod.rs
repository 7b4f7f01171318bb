//! Command handlers for the churchbooks CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod auth;
mod dashboard;
mod expense;
mod income;
mod init;
mod report;
mod table;
mod tithe;

use crate::aggregate::DateRange;
use crate::api::{open_store, Filter, RecordStore, Session};
use crate::args::ListArgs;
use crate::currency::CurrencyFormatter;
use crate::error::{ErrorType, IntoResult};
use crate::model::{earliest_date, Collection, Record, ValidationErrors};
use crate::{Config, Result};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::{login, logout, SignedIn};
pub use dashboard::{dashboard, Dashboard, StatCard};
pub use expense::{add_expense, list_expenses, update_expense};
pub use income::{add_income, list_income};
pub use init::init;
pub use report::{report_quarterly, report_trends};
pub use table::{OutputFormat, Rows};
pub use tithe::{add_tithe, list_tithes, update_tithe};

/// The output type for a command. This allows the command to return a consistent message,
/// optionally a body of text for the user, and optionally structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Text that is the result of the command, e.g. a table or a report, printed to stdout.
    #[serde(skip)]
    body: Option<String>,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            body: None,
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            body: None,
            structure: None,
        }
    }

    /// Adds text to be printed to stdout.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!`, the body to stdout and the structured data (if it exists) as
    /// JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(body) = self.body() {
            println!("{body}");
        }
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Everything a command that works with records needs: who is signed in, where the records are
/// and how to show amounts.
pub struct Context {
    session: Session,
    store: Box<dyn RecordStore>,
    currency: CurrencyFormatter,
    today: NaiveDate,
}

impl Context {
    /// Loads the signed-in session and opens the configured store.
    ///
    /// # Errors
    /// An `Auth` error if nobody is signed in, otherwise the errors of `open_store`.
    pub async fn load(config: &Config) -> Result<Self> {
        let session = Session::load(config).await?;
        let store = open_store(config, &session).await?;
        debug!("Signed in as {}", session.email);
        Ok(Self::new(config, session, store))
    }

    pub fn new(config: &Config, session: Session, store: Box<dyn RecordStore>) -> Self {
        Self {
            session,
            store,
            currency: CurrencyFormatter::new(config.currency()),
            today: Local::now().date_naive(),
        }
    }

    /// Pins the date that forms and periods are judged against.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn currency(&self) -> &CurrencyFormatter {
        &self.currency
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }
}

/// Permanently deletes a record of any kind.
pub async fn delete_record(ctx: &Context, collection: Collection, id: &str) -> Result<Out<String>> {
    ctx.store()
        .delete(collection, id)
        .await
        .pub_result(ErrorType::Store)?;
    Ok(Out::new(
        format!("Deleted {id} from {collection}"),
        id.to_string(),
    ))
}

/// The records of `collection` that `args` asks for, rendered in the requested format.
async fn list_records<T, F>(
    ctx: &Context,
    collection: Collection,
    args: &ListArgs,
    pick: F,
) -> Result<Out<Vec<T>>>
where
    T: table::Tabular + Clone + Debug,
    F: Fn(Record) -> Option<T>,
{
    let filter = list_filter(args, ctx.today());
    let records: Vec<T> = ctx
        .store()
        .query(collection, &filter)
        .await
        .pub_result(ErrorType::Store)?
        .into_iter()
        .filter_map(pick)
        .collect();
    let rows = table::render(&records, args.format, ctx.currency())?;
    Ok(Out::new(
        format!("Found {} records in {collection}", records.len()),
        records,
    )
    .with_body(rows.to_string()))
}

/// An open-ended `--from` runs to today and an open-ended `--to` starts at the earliest date a
/// record may have.
fn list_filter(args: &ListArgs, today: NaiveDate) -> Filter {
    let filter = match (args.from, args.to) {
        (None, None) => Filter::all(),
        (from, to) => Filter::within(DateRange::new(
            from.unwrap_or_else(earliest_date),
            to.unwrap_or(today),
        )),
    };
    filter.with_limit(args.limit)
}

/// Turns form validation failures into a `Validation` error listing every field.
fn invalid<T>(result: std::result::Result<T, ValidationErrors>) -> Result<T> {
    result.pub_result(ErrorType::Validation)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::test::TestEnv;

    pub(crate) fn context(env: &TestEnv) -> Context {
        Context::new(
            env.config(),
            env.session().clone(),
            Box::new(env.store().clone()),
        )
    }

    #[test]
    fn test_out() {
        let out: Out<u32> = Out::new("Done", 7).with_body("| a |");
        assert_eq!(out.message(), "Done");
        assert_eq!(out.body(), Some("| a |"));
        assert_eq!(out.structure(), Some(&7));

        let out: Out<()> = "Just a message".into();
        assert_eq!(out.body(), None);
        assert!(out.structure().is_none());
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("body").is_none());
    }

    #[tokio::test]
    async fn test_context_load_requires_session() {
        let env = TestEnv::new().await;
        let ctx = Context::load(env.config()).await.unwrap();
        assert_eq!(ctx.session().email, crate::test::TEST_EMAIL);
        assert_eq!(ctx.currency().code(), "XAF");

        Session::clear(env.config()).await.unwrap();
        let err = Context::load(env.config()).await.err().unwrap();
        assert_eq!(crate::error::error_type(&err), Some(ErrorType::Auth));
    }

    #[test]
    fn test_list_filter() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(list_filter(&ListArgs::default(), today), Filter::all());

        let args = ListArgs {
            from: NaiveDate::from_ymd_opt(2024, 1, 1),
            limit: Some(3),
            ..ListArgs::default()
        };
        let filter = list_filter(&args, today);
        let range = filter.range.unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(range.end(), today);
        assert_eq!(filter.limit, Some(3));

        let args = ListArgs {
            to: NaiveDate::from_ymd_opt(2023, 12, 31),
            ..ListArgs::default()
        };
        assert_eq!(list_filter(&args, today).range.unwrap().start(), earliest_date());
    }

    #[tokio::test]
    async fn test_delete_missing_record() {
        let env = TestEnv::new().await;
        let ctx = context(&env);
        let err = delete_record(&ctx, Collection::Tithes, "nope")
            .await
            .unwrap_err();
        assert_eq!(crate::error::error_type(&err), Some(ErrorType::Store));
    }
}
