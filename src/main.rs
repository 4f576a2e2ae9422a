use clap::{Parser, Subcommand};
use dotenv::dotenv;
use financial_query_assistant::ledger::FundPerformance;
use financial_query_assistant::{AssistantConfig, FinancialAssistant};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "finq")]
#[command(about = "Ask questions about your bank statements and plan financial goals")]
struct Cli {
    /// SQLite database file (overrides FINQ_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a question about stored transactions, or plan a goal
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
    /// Read a bank statement PDF into the ledger
    Ingest { pdf: PathBuf },
    /// Show monthly balances and fund suggestions
    Dashboard,
    /// Plan a purchase such as "buy a car for 800000 in 2 years"
    Plan {
        /// Monthly saving; defaults to the average monthly balance
        #[arg(long)]
        saving: Option<f64>,
        #[arg(required = true, num_args = 1..)]
        sentence: Vec<String>,
    },
    /// Load fund returns from a JSON array of fund records
    Funds { file: PathBuf },
}

const DEFAULT_LOG_FILTER: &str = "info";

fn log_env() -> env_logger::Env<'static> {
    env_logger::Env::default().default_filter_or(DEFAULT_LOG_FILTER)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    env_logger::Builder::from_env(log_env()).init();

    let cli = Cli::parse();
    let mut config = AssistantConfig::from_env()?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    info!("Using database {}", config.database.path.display());

    let assistant = FinancialAssistant::from_config(&config);

    match cli.command {
        Command::Ask { question } => {
            let reply = assistant.answer(&question.join(" ")).await;
            print_json(&reply)?;
        }
        Command::Ingest { pdf } => {
            let summary = assistant.ingest_statement(&pdf).await?;
            print_json(&summary)?;
        }
        Command::Dashboard => {
            print_json(&assistant.dashboard()?)?;
        }
        Command::Plan { saving, sentence } => {
            let saving = match saving {
                Some(saving) => saving,
                None => assistant.monthly_saving()? as f64,
            };
            let plan = assistant.plan(&sentence.join(" "), saving).await?;
            print_json(&plan)?;
        }
        Command::Funds { file } => {
            let funds: Vec<FundPerformance> = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
            let count = assistant.import_funds(&funds)?;
            eprintln!("Imported {} funds from {}", count, file.display());
        }
    }

    Ok(())
}
