mod config;
mod loader;
mod models;
mod pipeline;
mod scheduler;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::loader::load_stations;
use crate::pipeline::{Pipeline, RunOutcome};
use crate::storage::HistoryStore;

#[derive(Parser)]
#[command(name = "diesel-prices", about = "Diesel price collector for TOTAL and JET stations", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Exit immediately without scheduling or running anything
    #[arg(long, env = "DIESEL_DISABLE")]
    disable: bool,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Run the collector at the configured times of day (default)
    Schedule,

    /// Collect prices once now and append them to the history file
    Run,

    /// Show history file statistics
    Stats,

    /// List the stations that will be scraped
    Stations,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.disable {
        println!("Collector disabled, exiting.");
        return Ok(());
    }

    let config = AppConfig::load()?;
    init_logging(cli.verbose, config.logging.file.as_deref())?;

    match cli.command.unwrap_or(Command::Schedule) {
        Command::Schedule => {
            let pipeline = Arc::new(Pipeline::new(config.clone()));
            let mut scheduler = scheduler::build_scheduler(pipeline, &config.schedule.times).await?;

            info!("Collector active, waiting for scheduled runs (Ctrl-C to stop)");
            tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;

            info!("Shutting down scheduler");
            scheduler.shutdown().await.context("Scheduler shutdown failed")?;
        }

        Command::Run => match Pipeline::new(config).run_once().await {
            RunOutcome::Completed(stats) => info!(
                "Done: {}/{} stations answered, {} rows written, {} without price, {} failed",
                stats.observations, stats.stations, stats.rows_written, stats.missing_prices, stats.failures
            ),
            other => info!("Run ended without writing: {:?}", other),
        },

        Command::Stats => {
            let store = HistoryStore::open(&config.storage.history_path, config.storage.write_mode)?;
            let s = store.summary()?;
            let day = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or("—".into());
            println!("─────────────────────────────────");
            println!("  Diesel prices — History Stats");
            println!("─────────────────────────────────");
            println!("  File       : {}", store.path().display());
            println!("  Rows       : {}", utils::fmt_count(s.rows));
            println!("  No price   : {}", utils::fmt_count(s.missing_prices));
            println!("  From       : {}", day(s.first_date));
            println!("  To         : {}", day(s.last_date));
            println!("─────────────────────────────────");
        }

        Command::Stations => {
            let stations = load_stations(&config.storage.stations_path)?;
            if stations.is_empty() {
                println!("No usable stations in {}", config.storage.stations_path.display());
            } else {
                println!("{} stations:", stations.len());
                for s in stations.iter() {
                    println!("  {:<6} {:<20} {}  {}", s.vendor, s.region, s.address, s.link);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let filter = match verbose {
        0 => "diesel_prices=info,warn",
        1 => "diesel_prices=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create log dir {:?}", parent))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Could not open log file {:?}", path))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false).with_target(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}
