pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::models::{Observation, StationConfig};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, Timelike};
use tracing::{debug, info, warn};

pub use self::http_client::FetchError;
use self::http_client::HttpClient;
use self::parsers::extract_price;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Turns one configured station into one observation.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// `Err` only when the page itself could not be retrieved. A page without
    /// a readable price still yields an observation, with `price: None`.
    async fn fetch_observation(&self, station: &StationConfig) -> Result<Observation, FetchError>;
}

// ── Station scraper ───────────────────────────────────────────────────────────

pub struct StationScraper {
    client: HttpClient,
}

impl StationScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl PriceSource for StationScraper {
    async fn fetch_observation(&self, station: &StationConfig) -> Result<Observation, FetchError> {
        info!(vendor = %station.vendor, url = %station.link, "Fetching station page");

        let html = self.client.get_text(&station.link).await?;
        debug!(url = %station.link, bytes = html.len(), "Page received");

        let price = extract_price(&html, station.vendor);
        match price {
            Some(p) => info!(vendor = %station.vendor, url = %station.link, price = p, "Price found"),
            None => warn!(vendor = %station.vendor, url = %station.link, "No price on page"),
        }

        let now = Local::now().naive_local();
        let time = now.time().with_nanosecond(0).unwrap_or(now.time());

        Ok(Observation {
            region: station.region.clone(),
            address: station.address.clone(),
            vendor: station.vendor,
            product: station.vendor.product_label().to_string(),
            price,
            date: now.date(),
            time,
            source_url: station.link.clone(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
