use clap::{Parser, Subcommand};
use pocketbook::infra::migrate::{inline_unique_constraints, unowned_counts};
use pocketbook::infra::{init_db, DbPool, Schema, StepStatus};
use pocketbook::{AppConfig, AppError};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pocketbook", version, about = "Pocketbook store maintenance")]
struct Cli {
    #[command(flatten)]
    config: AppConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bring the database to the current multi-tenant schema.
    Migrate,
    /// Show rows still waiting for an owner.
    Status,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn migrate(config: &AppConfig) -> Result<(), AppError> {
    log::info!("DB path: {:?}", config.db_path);
    let (_pool, report) = init_db(config)?;
    for step in &report.steps {
        let marker = match step.status {
            StepStatus::Applied => "+",
            StepStatus::Unchanged => "=",
            StepStatus::Warning => "!",
        };
        println!("{marker} [{}] {}: {}", step.stage, step.step, step.detail);
    }
    println!("reached {}", report.stage);
    Ok(())
}

fn status(config: &AppConfig) -> Result<(), AppError> {
    let pool = DbPool::open(config)?;
    let conn = pool.connect()?;
    let schema = Schema::canonical();
    for (table, n) in unowned_counts(&conn, &schema)? {
        println!("{table}: {n} unowned");
    }
    for (table, index, columns) in inline_unique_constraints(&conn, &schema)? {
        println!(
            "{table}: inline unique {index} ({}) needs a table rebuild",
            columns.join(", ")
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Command::Migrate => migrate(&cli.config),
        Command::Status => status(&cli.config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{} ({})", e, e.code());
            ExitCode::FAILURE
        }
    }
}
