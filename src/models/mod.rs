use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Vendor ────────────────────────────────────────────────────────────────────

/// Retail chains whose station pages we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Total,
    Jet,
}

impl Vendor {
    /// Parse the `stacja` tag from the station file ("jet" / "total", any case).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "total" => Some(Vendor::Total),
            "jet" => Some(Vendor::Jet),
            _ => None,
        }
    }

    /// Value of the `Stacja` column.
    pub fn station_label(self) -> &'static str {
        match self {
            Vendor::Total => "TOTAL",
            Vendor::Jet => "JET",
        }
    }

    /// Value of the `Produkt` column.
    pub fn product_label(self) -> &'static str {
        match self {
            Vendor::Total => "Truck Diesel",
            Vendor::Jet => "Diesel",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.station_label())
    }
}

// ── Station ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StationConfig {
    pub link: String,
    pub address: String,
    pub region: String,
    pub vendor: Vendor,
}

/// Stations partitioned by vendor, each list in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationList {
    pub total: Vec<StationConfig>,
    pub jet: Vec<StationConfig>,
}

impl StationList {
    pub fn len(&self) -> usize {
        self.total.len() + self.jet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// TOTAL stations first, then JET.
    pub fn iter(&self) -> impl Iterator<Item = &StationConfig> {
        self.total.iter().chain(self.jet.iter())
    }
}

// ── Observation ───────────────────────────────────────────────────────────────

/// One price reading for one station. `price` is `None` when the page was
/// fetched but no price could be read from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub region: String,
    pub address: String,
    pub vendor: Vendor,
    pub product: String,
    pub price: Option<f64>,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub source_url: String,
}

// ── History file row ──────────────────────────────────────────────────────────

pub const HISTORY_HEADER: [&str; 8] = [
    "Adres", "Region", "Stacja", "Produkt", "Cena", "Data", "Godzina", "Źródło",
];

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One row of the history CSV, kept as text so that rows read back from disk
/// are rewritten exactly as they were stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(rename = "Adres")]
    pub address: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "Stacja")]
    pub station: String,
    #[serde(rename = "Produkt")]
    pub product: String,
    #[serde(rename = "Cena")]
    pub price: String,
    #[serde(rename = "Data")]
    pub date: String,
    #[serde(rename = "Godzina")]
    pub time: String,
    #[serde(rename = "Źródło")]
    pub source: String,
}

impl HistoryRow {
    /// `None` for an empty `Cena` cell or one that isn't a number.
    pub fn price_value(&self) -> Option<f64> {
        let p = self.price.trim();
        if p.is_empty() { None } else { p.parse().ok() }
    }

    pub fn date_value(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.date.trim(), DATE_FORMAT).ok()
    }
}

impl From<&Observation> for HistoryRow {
    fn from(o: &Observation) -> Self {
        Self {
            address: o.address.clone(),
            region: o.region.clone(),
            station: o.vendor.station_label().to_string(),
            product: o.product.clone(),
            price: o.price.map(format_price).unwrap_or_default(),
            date: o.date.format(DATE_FORMAT).to_string(),
            time: o.time.format(TIME_FORMAT).to_string(),
            source: o.source_url.clone(),
        }
    }
}

/// Shortest decimal that round-trips; whole numbers keep a trailing `.0`.
/// 1.539 → "1.539" | 12.34 → "12.34" | 2.0 → "2.0"
pub fn format_price(p: f64) -> String {
    let s = p.to_string();
    if p.is_finite() && !s.contains('.') && !s.contains('e') {
        format!("{s}.0")
    } else {
        s
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(price: Option<f64>) -> Observation {
        Observation {
            region: "Mazowieckie".into(),
            address: "ul. Łódzka 5, Płońsk".into(),
            vendor: Vendor::Total,
            product: "Truck Diesel".into(),
            price,
            date: NaiveDate::from_ymd_opt(2024, 3, 7).unwrap(),
            time: NaiveTime::from_hms_opt(7, 0, 5).unwrap(),
            source_url: "https://total.example/station/1".into(),
        }
    }

    #[test]
    fn test_vendor_from_tag() {
        assert_eq!(Vendor::from_tag("JET"), Some(Vendor::Jet));
        assert_eq!(Vendor::from_tag(" Total "), Some(Vendor::Total));
        assert_eq!(Vendor::from_tag("orlen"), None);
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1.539), "1.539");
        assert_eq!(format_price(12.34), "12.34");
        assert_eq!(format_price(2.0), "2.0");
        assert_eq!(format_price(0.0), "0.0");
    }

    #[test]
    fn test_history_row_from_observation() {
        let row = HistoryRow::from(&observation(Some(1.539)));
        assert_eq!(row.station, "TOTAL");
        assert_eq!(row.price, "1.539");
        assert_eq!(row.date, "2024-03-07");
        assert_eq!(row.time, "07:00:05");
        assert_eq!(row.price_value(), Some(1.539));
    }

    #[test]
    fn test_missing_price_is_empty_not_zero() {
        let row = HistoryRow::from(&observation(None));
        assert_eq!(row.price, "");
        assert_eq!(row.price_value(), None);

        let zero = HistoryRow::from(&observation(Some(0.0)));
        assert_eq!(zero.price_value(), Some(0.0));
    }
}
