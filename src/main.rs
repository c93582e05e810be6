use clap::{Parser, Subcommand};
use customer_mart::driver::{PipelineDriver, RunOutcome};
use customer_mart::extract::{CsvExtractor, Extractor};
use customer_mart::load::PostgresDestination;
use customer_mart::transform::transform;
use customer_mart::{logging, Config};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "customer_mart")]
#[command(about = "Batch ETL pipeline reconciling customer, order and payment data")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full extract-transform-load cycle
    Run {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Extract and transform without loading, printing a sample of the output
    Preview {
        /// Path to the TOML configuration file
        #[arg(long, default_value = "config.toml")]
        config: PathBuf,
        /// How many aggregated rows to print
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init_logging();
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = Config::load(&config)?;
            let destination = Arc::new(PostgresDestination::connect(&config.destination).await?);
            let driver = PipelineDriver::from_config(&config, destination);

            let report = driver.run_once().await;
            // The scheduler consumes this line; keep it machine-readable.
            println!("{}", serde_json::to_string(&report)?);

            Ok(match report.outcome {
                RunOutcome::Success => ExitCode::SUCCESS,
                RunOutcome::Failed { .. } => ExitCode::from(1),
                RunOutcome::PartiallyApplied { .. } => ExitCode::from(2),
            })
        }
        Commands::Preview { config, limit } => {
            let config = Config::load(&config)?;
            let customers = CsvExtractor::customers(&config.sources.customers);
            let orders = CsvExtractor::orders(&config.sources.orders);
            let payments = CsvExtractor::payments(&config.sources.payments);

            let (customers, orders, payments) =
                tokio::try_join!(customers.extract(), orders.extract(), payments.extract())?;
            info!(
                customers = customers.len(),
                orders = orders.len(),
                payments = payments.len(),
                "sources extracted"
            );

            let aggregated = transform(&customers, &orders, &payments)?;
            println!(
                "{}",
                aggregated
                    .schema()
                    .names()
                    .collect::<Vec<_>>()
                    .join(" | ")
            );
            for row in aggregated.rows().iter().take(limit) {
                let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("{}", cells.join(" | "));
            }
            println!(
                "{} aggregated rows ({} shown), nothing loaded",
                aggregated.len(),
                aggregated.len().min(limit)
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
