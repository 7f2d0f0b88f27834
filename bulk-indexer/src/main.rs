//! Bulk Indexer - blue/green search index loader
//!
//! Entry point: loads an NDJSON dataset into the non-live index behind an
//! alias and swaps the alias once the load succeeded.

use std::process::ExitCode;

use bulk_indexer::{Cli, LogFormat, RunConfig};
use clap::Parser;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Text => subscriber.init(),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if cli.dump_config {
        cli.dump();
    }

    let config = match RunConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::from(e.exit_code());
        }
    };

    match bulk_indexer::run(&config).await {
        Ok(report) => {
            info!(
                alias = %report.alias,
                index = %report.target_index,
                succeeded = report.succeeded,
                rejected = report.rejected,
                "Indexing complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Indexing failed");
            ExitCode::from(e.exit_code())
        }
    }
}
