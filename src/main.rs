use church_books::args::{
    Args, Command, ExpenseCommand, IncomeCommand, ReportKind, TitheCommand,
};
use church_books::commands::{self, Context};
use church_books::model::Collection;
use church_books::report::Gemini;
use church_books::{Config, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // Route to appropriate command handler
    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args).await?.print(),

        Command::Login(login_args) => {
            let config = Config::load(home).await?;
            commands::login(&config, &login_args.email, &login_args.password)
                .await?
                .print()
        }

        Command::Logout => commands::logout(&Config::load(home).await?).await?.print(),

        Command::Income(income_args) => {
            let ctx = Context::load(&Config::load(home).await?).await?;
            match income_args.command() {
                IncomeCommand::Add(args) => commands::add_income(&ctx, args.clone()).await?.print(),
                IncomeCommand::List(args) => commands::list_income(&ctx, args).await?.print(),
                IncomeCommand::Delete(args) => {
                    commands::delete_record(&ctx, Collection::Income, &args.id)
                        .await?
                        .print()
                }
            }
        }

        Command::Tithe(tithe_args) => {
            let ctx = Context::load(&Config::load(home).await?).await?;
            match tithe_args.command() {
                TitheCommand::Add(args) => commands::add_tithe(&ctx, args.clone()).await?.print(),
                TitheCommand::List(args) => commands::list_tithes(&ctx, args).await?.print(),
                TitheCommand::Update(args) => {
                    commands::update_tithe(&ctx, args.clone()).await?.print()
                }
                TitheCommand::Delete(args) => {
                    commands::delete_record(&ctx, Collection::Tithes, &args.id)
                        .await?
                        .print()
                }
            }
        }

        Command::Expense(expense_args) => {
            let ctx = Context::load(&Config::load(home).await?).await?;
            match expense_args.command() {
                ExpenseCommand::Add(args) => {
                    commands::add_expense(&ctx, args.clone()).await?.print()
                }
                ExpenseCommand::List(args) => commands::list_expenses(&ctx, args).await?.print(),
                ExpenseCommand::Update(args) => {
                    commands::update_expense(&ctx, args.clone()).await?.print()
                }
                ExpenseCommand::Delete(args) => {
                    commands::delete_record(&ctx, Collection::Expenses, &args.id)
                        .await?
                        .print()
                }
            }
        }

        Command::Dashboard(dashboard_args) => {
            let ctx = Context::load(&Config::load(home).await?).await?;
            commands::dashboard(&ctx, dashboard_args).await?.print()
        }

        Command::Report(report_args) => {
            let config = Config::load(home).await?;
            let ctx = Context::load(&config).await?;
            let generator = || Gemini::new(&config);
            match report_args.kind() {
                ReportKind::Quarterly => commands::report_quarterly(&ctx, generator)
                    .await?
                    .print(),
                ReportKind::Trends => commands::report_trends(&ctx, generator).await?.print(),
            }
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
