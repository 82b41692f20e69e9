use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sql_bridge::config::BridgeConfig;
use sql_bridge::service::{AskRequest, BridgeService};
use tracing::info;

#[derive(Parser)]
#[command(name = "sql-bridge")]
#[command(about = "Ask questions about a MySQL database in natural language")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate SQL for a question and (by default) run it
    Ask {
        question: String,

        /// Only generate and validate the SQL
        #[arg(long)]
        no_execute: bool,

        /// Include the prompt schema context in the output
        #[arg(long)]
        debug: bool,
    },
    /// Check a SELECT statement against the safety rules and live schema
    Validate { sql: String },
    /// Print the compact schema catalog
    Schema,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = BridgeConfig::from_env()?;
    sql_bridge::logging::init()?;

    let service = BridgeService::connect(&config).await?;

    match args.command {
        Command::Ask {
            question,
            no_execute,
            debug,
        } => {
            info!(%question, "ask");
            let request = AskRequest {
                question,
                execute: !no_execute,
                debug,
            };
            let outcome = service.ask(&request).await?;
            print_json(&outcome)?;
            if outcome.status_code() != 200 {
                std::process::exit(1);
            }
        }
        Command::Validate { sql } => {
            let outcome = service.validate_sql(&sql).await?;
            print_json(&outcome)?;
            if !outcome.ok {
                std::process::exit(1);
            }
        }
        Command::Schema => print_json(&service.schema().await?)?,
    }

    Ok(())
}
