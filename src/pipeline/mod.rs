//! Pipeline orchestrator: station file → scraper → history CSV.
//!
//! `run_once()` is one full cycle and what the scheduler calls:
//!   1. Load the station list (abort the cycle if it can't be read)
//!   2. Fetch every station, TOTAL list first then JET, in bounded parallel
//!   3. Append whatever came back to the history file (skipped when empty)
//!
//! A station that can't be fetched is logged and left out; only a bad station
//! file or a failed write ends a cycle early. Nothing is carried between runs.

use crate::config::AppConfig;
use crate::loader::load_stations;
use crate::models::{Observation, StationConfig, StationList};
use crate::scraper::{PriceSource, StationScraper};
use crate::storage::HistoryStore;
use crate::utils::Timer;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

// ── Aggregation ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Collected {
    pub observations: Vec<Observation>,
    pub failures: usize,
}

/// Fetch every station with at most `concurrency` requests in flight.
/// Output order follows `stations.iter()` regardless of completion order.
pub async fn collect_observations(
    source: Arc<dyn PriceSource>,
    stations: &StationList,
    concurrency: usize,
) -> Collected {
    let sem = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(stations.len());

    for station in stations.iter() {
        let station: StationConfig = station.clone();
        let source = Arc::clone(&source);
        let sem = Arc::clone(&sem);

        let link = station.link.clone();
        let handle = tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.ok();
            source.fetch_observation(&station).await
        });

        handles.push((link, handle));
    }

    let mut collected = Collected::default();
    for (link, handle) in handles {
        match handle.await {
            Ok(Ok(obs)) => collected.observations.push(obs),
            Ok(Err(e)) => {
                error!(url = %link, "Fetch failed: {}", e);
                collected.failures += 1;
            }
            Err(e) => {
                error!(url = %link, "Task panic: {}", e);
                collected.failures += 1;
            }
        }
    }

    collected
}

// ── Runner ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub stations: usize,
    pub observations: usize,
    pub missing_prices: usize,
    pub failures: usize,
    pub rows_written: usize,
}

/// How a cycle ended. Errors are logged where they happen, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(RunStats),
    NothingCollected { stations: usize, failures: usize },
    ConfigFailed,
    PersistFailed,
}

pub struct Pipeline {
    config: AppConfig,
    source: Option<Arc<dyn PriceSource>>,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config, source: None }
    }

    /// Use a prebuilt source instead of building an HTTP scraper per run.
    pub fn with_source(config: AppConfig, source: Arc<dyn PriceSource>) -> Self {
        Self {
            config,
            source: Some(source),
        }
    }

    pub async fn run_once(&self) -> RunOutcome {
        let _t = Timer::start("Price collection run");

        // ── 1. Station list ───────────────────────────────────────────────────
        let stations = match load_stations(&self.config.storage.stations_path) {
            Ok(s) => s,
            Err(e) => {
                error!("Aborting run: {}", e);
                return RunOutcome::ConfigFailed;
            }
        };

        let source = match &self.source {
            Some(s) => Arc::clone(s),
            None => match StationScraper::new(&self.config.scraper) {
                Ok(s) => Arc::new(s) as Arc<dyn PriceSource>,
                Err(e) => {
                    error!("Aborting run: {:#}", e);
                    return RunOutcome::ConfigFailed;
                }
            },
        };

        // ── 2. Fetch ──────────────────────────────────────────────────────────
        info!("Fetching {} stations", stations.len());
        let collected =
            collect_observations(source, &stations, self.config.pipeline.concurrency).await;

        if collected.observations.is_empty() {
            warn!(
                "No observations from {} stations ({} failed); history left unchanged",
                stations.len(),
                collected.failures
            );
            return RunOutcome::NothingCollected {
                stations: stations.len(),
                failures: collected.failures,
            };
        }

        // ── 3. Persist ────────────────────────────────────────────────────────
        let storage = &self.config.storage;
        let written = HistoryStore::open(&storage.history_path, storage.write_mode)
            .and_then(|store| store.append(&collected.observations));

        let rows_written = match written {
            Ok(n) => n,
            Err(e) => {
                error!("Could not save observations: {}", e);
                return RunOutcome::PersistFailed;
            }
        };

        let stats = RunStats {
            stations: stations.len(),
            observations: collected.observations.len(),
            missing_prices: collected.observations.iter().filter(|o| o.price.is_none()).count(),
            failures: collected.failures,
            rows_written,
        };

        info!(
            "=== Done: {} stations | {} rows | {} without price | {} failed ===",
            stats.stations, stats.rows_written, stats.missing_prices, stats.failures
        );
        RunOutcome::Completed(stats)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
