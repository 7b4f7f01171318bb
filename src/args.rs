//! These structs provide the CLI interface for the churchbooks CLI.

use crate::commands::OutputFormat;
use crate::config::Backend;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing::level_filters::LevelFilter;

/// churchbooks: Financial record keeping for a church.
///
/// Record offerings, donations, tithes and expenses, see where the money comes from and where it
/// goes, and ask an AI model for a quarterly summary or a year of trends. Amounts are shown in
/// CFA francs (XAF).
///
/// Records are kept in a Firestore project shared by the church's treasurers, or in a local SQLite
/// file when you pass `--backend sqlite` to `init`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. With the default firestore backend you need the
    /// Firebase project id and the web API key of the church's project. With `--backend sqlite`
    /// records are kept in a file in the data directory and nothing else is needed.
    Init(InitArgs),
    /// Sign in. Every other command needs a signed-in user.
    Login(LoginArgs),
    /// Sign out and forget the saved session.
    Logout,
    /// Record, list and delete offerings, donations and other income.
    Income(IncomeArgs),
    /// Record, list, edit and delete members' tithes.
    Tithe(TitheArgs),
    /// Record, list, edit and delete expenses.
    Expense(ExpenseArgs),
    /// Show income and expense totals, the last six months and the income breakdown.
    Dashboard(DashboardArgs),
    /// Generate a financial report with an AI model.
    Report(ReportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where church-books data and configuration is held. Defaults to
    /// ~/church-books
    #[arg(long, env = "CHURCH_BOOKS_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `churchbooks init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Where records are kept.
    #[arg(long, value_enum, default_value_t = Backend::Firestore)]
    pub backend: Backend,

    /// The Firebase project id. Required for the firestore backend.
    #[arg(long)]
    pub project_id: Option<String>,

    /// The Firebase web API key. Required for the firestore backend.
    #[arg(long)]
    pub api_key: Option<String>,

    /// The model used for reports. Defaults to gemini-2.0-flash.
    #[arg(long)]
    pub model: Option<String>,
}

/// (Not shown): Args for the `churchbooks login` command.
#[derive(Debug, Parser, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,

    /// Not needed for the sqlite backend.
    #[arg(long, env = "CHURCH_BOOKS_PASSWORD", hide_env_values = true, default_value = "")]
    pub password: String,
}

#[derive(Debug, Parser, Clone)]
pub struct IncomeArgs {
    #[command(subcommand)]
    command: IncomeCommand,
}

impl IncomeArgs {
    pub fn command(&self) -> &IncomeCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum IncomeCommand {
    /// Record an offering, tithe, donation or other income.
    Add(AddIncomeArgs),
    /// List income records, newest first.
    List(ListArgs),
    /// Permanently delete an income record.
    Delete(DeleteArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct TitheArgs {
    #[command(subcommand)]
    command: TitheCommand,
}

impl TitheArgs {
    pub fn command(&self) -> &TitheCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum TitheCommand {
    /// Record a member's tithe.
    Add(AddTitheArgs),
    /// List tithes, newest first.
    List(ListArgs),
    /// Change the fields you pass of an existing tithe.
    Update(UpdateTitheArgs),
    /// Permanently delete a tithe.
    Delete(DeleteArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    command: ExpenseCommand,
}

impl ExpenseArgs {
    pub fn command(&self) -> &ExpenseCommand {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum ExpenseCommand {
    /// Record money spent.
    Add(AddExpenseArgs),
    /// List expenses, newest first.
    List(ListArgs),
    /// Change the fields you pass of an existing expense.
    Update(UpdateExpenseArgs),
    /// Permanently delete an expense.
    Delete(DeleteArgs),
}

/// Form fields are taken as text so that every problem can be reported at once.
#[derive(Debug, Default, Parser, Clone)]
pub struct AddIncomeArgs {
    /// YYYY-MM-DD, defaults to today.
    #[arg(long)]
    pub date: Option<String>,

    /// One of: Offering, Tithe, Donation, Other
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub amount: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Required when the category is Tithe.
    #[arg(long)]
    pub member_name: Option<String>,
}

#[derive(Debug, Default, Parser, Clone)]
pub struct AddTitheArgs {
    #[arg(long)]
    pub member_name: Option<String>,

    /// YYYY-MM-DD, defaults to today.
    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub amount: Option<String>,
}

#[derive(Debug, Default, Parser, Clone)]
pub struct UpdateTitheArgs {
    /// The id of the tithe, as shown by `tithe list`.
    pub id: String,

    #[arg(long)]
    pub member_name: Option<String>,

    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub amount: Option<String>,
}

#[derive(Debug, Default, Parser, Clone)]
pub struct AddExpenseArgs {
    /// YYYY-MM-DD, defaults to today.
    #[arg(long)]
    pub date: Option<String>,

    /// One of: Utilities, Salaries, Rent, Maintenance, Missions, Outreach, Supplies, Events,
    /// Transport, Other
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub amount: Option<String>,

    #[arg(long)]
    pub payee: Option<String>,

    /// One of: Cash, Bank Transfer, Mobile Money, Cheque, Other
    #[arg(long)]
    pub payment_method: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Parser, Clone)]
pub struct UpdateExpenseArgs {
    /// The id of the expense, as shown by `expense list`.
    pub id: String,

    #[arg(long)]
    pub date: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub amount: Option<String>,

    #[arg(long)]
    pub payee: Option<String>,

    #[arg(long)]
    pub payment_method: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Default, Parser, Clone)]
pub struct ListArgs {
    /// Only records on or after this date (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Only records on or before this date (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// At most this many records.
    #[arg(long)]
    pub limit: Option<u32>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Debug, Default, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the record to delete.
    pub id: String,
}

/// (Not shown): Args for the `churchbooks dashboard` command.
#[derive(Debug, Default, Parser, Clone)]
pub struct DashboardArgs {
    /// Restrict the totals to records on or after this date (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Restrict the totals to records on or before this date (YYYY-MM-DD).
    #[arg(long)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    #[command(subcommand)]
    kind: ReportKind,
}

impl ReportArgs {
    pub fn new(kind: ReportKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Summarize the last three full months.
    Quarterly,
    /// Identify trends, insights and recommendations in the last twelve months.
    Trends,
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("church-books"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or CHURCH_BOOKS_HOME instead of relying on the default \
                church-books home directory. If you continue using the program right now, you may \
                have problems!",
            );
            PathBuf::from("church-books")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_common_args() {
        let args = parse(&[
            "churchbooks",
            "--log-level",
            "debug",
            "--home",
            "/tmp/books",
            "logout",
        ]);
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        assert_eq!(args.common().home().path(), Path::new("/tmp/books"));
        assert!(matches!(args.command(), Command::Logout));
    }

    #[test]
    fn test_init_args() {
        let args = parse(&["churchbooks", "init", "--backend", "sqlite"]);
        let Command::Init(init) = args.command() else {
            panic!("expected init")
        };
        assert_eq!(init.backend, Backend::Sqlite);
        assert_eq!(init.project_id, None);
    }

    #[test]
    fn test_expense_add_takes_text() {
        let args = parse(&[
            "churchbooks",
            "expense",
            "add",
            "--category",
            "Rent",
            "--amount",
            "60 000",
            "--payment-method",
            "Mobile Money",
        ]);
        let Command::Expense(expense) = args.command() else {
            panic!("expected expense")
        };
        let ExpenseCommand::Add(add) = expense.command() else {
            panic!("expected add")
        };
        assert_eq!(add.amount.as_deref(), Some("60 000"));
        assert_eq!(add.payment_method.as_deref(), Some("Mobile Money"));
        assert_eq!(add.date, None);
    }

    #[test]
    fn test_list_args() {
        let args = parse(&[
            "churchbooks",
            "tithe",
            "list",
            "--from",
            "2024-01-01",
            "--limit",
            "10",
            "--format",
            "csv",
        ]);
        let Command::Tithe(tithe) = args.command() else {
            panic!("expected tithe")
        };
        let TitheCommand::List(list) = tithe.command() else {
            panic!("expected list")
        };
        assert_eq!(list.from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(list.to, None);
        assert_eq!(list.limit, Some(10));
        assert_eq!(list.format, OutputFormat::Csv);

        assert!(Args::try_parse_from(["churchbooks", "tithe", "list", "--from", "01/01/2024"])
            .is_err());
    }

    #[test]
    fn test_report_kind() {
        let args = parse(&["churchbooks", "report", "trends"]);
        let Command::Report(report) = args.command() else {
            panic!("expected report")
        };
        assert_eq!(report.kind(), ReportKind::Trends);
    }
}
