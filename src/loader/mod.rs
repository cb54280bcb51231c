//! Station list loader: reads the JSON station file and splits it per vendor.

use crate::models::{StationConfig, StationList, Vendor};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Error)]
pub enum StationConfigError {
    #[error("cannot read station file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("station file {path:?} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("station file {path:?} must contain a list of stations")]
    NotAList { path: PathBuf },

    #[error("station file {path:?}: entry {index} is not a station record")]
    NotARecord { path: PathBuf, index: usize },
}

/// Load the station list. Records with a missing field, an unknown vendor tag
/// or an unusable link are skipped. A missing/unreadable file, a top-level
/// value that isn't an array, or an array entry that isn't an object is an
/// error. Field values are kept exactly as written.
pub fn load_stations(path: &Path) -> Result<StationList, StationConfigError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StationConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let text = std::fs::read_to_string(path).map_err(|source| StationConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let stations = parse_stations(&text).map_err(|e| match e {
        ParseError::Json(source) => StationConfigError::Json {
            path: path.to_path_buf(),
            source,
        },
        ParseError::NotAList => StationConfigError::NotAList {
            path: path.to_path_buf(),
        },
        ParseError::NotARecord(index) => StationConfigError::NotARecord {
            path: path.to_path_buf(),
            index,
        },
    })?;

    info!(
        "Loaded {} stations from {:?} ({} TOTAL, {} JET)",
        stations.len(),
        path,
        stations.total.len(),
        stations.jet.len()
    );
    Ok(stations)
}

enum ParseError {
    Json(serde_json::Error),
    NotAList,
    NotARecord(usize),
}

fn parse_stations(text: &str) -> Result<StationList, ParseError> {
    let value: Value = serde_json::from_str(text).map_err(ParseError::Json)?;
    let Value::Array(items) = value else {
        return Err(ParseError::NotAList);
    };

    let mut list = StationList::default();
    for (i, item) in items.iter().enumerate() {
        if !item.is_object() {
            return Err(ParseError::NotARecord(i));
        }
        let Some(station) = station_from_value(item) else {
            debug!("Skipping station entry {}: incomplete or unknown vendor", i);
            continue;
        };

        if !is_web_url(&station.link) {
            warn!("Skipping station entry {}: bad link {:?}", i, station.link);
            continue;
        }

        match station.vendor {
            Vendor::Total => list.total.push(station),
            Vendor::Jet => list.jet.push(station),
        }
    }
    Ok(list)
}

fn station_from_value(v: &Value) -> Option<StationConfig> {
    let field = |key: &str| {
        v.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    };

    let link = field("link")?;
    let vendor = Vendor::from_tag(field("stacja")?)?;
    let region = field("region")?;
    let address = field("adres")?;

    Some(StationConfig {
        link: link.to_string(),
        address: address.to_string(),
        region: region.to_string(),
        vendor,
    })
}

fn is_web_url(link: &str) -> bool {
    Url::parse(link)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const STATIONS: &str = r#"[
        {"link": "https://jet.example/a", "stacja": "JET", "region": "Śląskie", "adres": "Katowice 1"},
        {"link": "https://total.example/b", "stacja": "Total", "region": "Mazowieckie", "adres": "Warszawa 2"},
        {"link": "https://total.example/c", "stacja": "total", "region": "Pomorskie", "adres": "Gdańsk 3"},
        {"link": "https://orlen.example/d", "stacja": "orlen", "region": "Opolskie", "adres": "Opole 4"},
        {"link": "https://jet.example/e", "stacja": "jet", "region": "Łódzkie"},
        {"link": "", "stacja": "jet", "region": "Łódzkie", "adres": "Łódź 5"},
        {"link": "not a url", "stacja": "jet", "region": "Łódzkie", "adres": "Łódź 6"},
        {"link": "https://jet.example/f", "stacja": "jet", "region": "Łódzkie", "adres": "Łódź 7"}
    ]"#;

    fn parse(text: &str) -> StationList {
        match parse_stations(text) {
            Ok(list) => list,
            Err(_) => panic!("expected a station list"),
        }
    }

    #[test]
    fn test_partitions_by_vendor_in_order() {
        let list = parse(STATIONS);
        let total: Vec<_> = list.total.iter().map(|s| s.address.as_str()).collect();
        let jet: Vec<_> = list.jet.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(total, ["Warszawa 2", "Gdańsk 3"]);
        assert_eq!(jet, ["Katowice 1", "Łódź 7"]);
    }

    #[test]
    fn test_iter_yields_total_before_jet() {
        let list = parse(STATIONS);
        let vendors: Vec<_> = list.iter().map(|s| s.vendor).collect();
        assert_eq!(vendors, [Vendor::Total, Vendor::Total, Vendor::Jet, Vendor::Jet]);
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let list = parse(
            r#"[{"link": "https://jet.example/x", "stacja": " Jet ", "region": " Mazowieckie ", "adres": "  ul. X 1  "}]"#,
        );
        assert_eq!(list.jet.len(), 1);
        assert_eq!(list.jet[0].address, "  ul. X 1  ");
        assert_eq!(list.jet[0].region, " Mazowieckie ");
    }

    #[test]
    fn test_blank_field_skips_record() {
        let list = parse(
            r#"[{"link": "https://jet.example/x", "stacja": "jet", "region": "   ", "adres": "ul. X 1"}]"#,
        );
        assert!(list.is_empty());
    }

    #[test]
    fn test_non_record_entry_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"link": "https://jet.example/a", "stacja": "jet", "region": "R", "adres": "A"}}, "stray"]"#
        )
        .unwrap();

        let err = load_stations(file.path()).unwrap_err();
        assert!(matches!(err, StationConfigError::NotARecord { index: 1, .. }));
    }

    #[test]
    fn test_empty_list_is_ok() {
        assert!(parse("[]").is_empty());
    }

    #[test]
    fn test_object_instead_of_list_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"link": "https://jet.example/a"}}"#).unwrap();

        let err = load_stations(file.path()).unwrap_err();
        assert!(matches!(err, StationConfigError::NotAList { .. }));
    }

    #[test]
    fn test_invalid_json_and_missing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[{{").unwrap();
        assert!(matches!(
            load_stations(file.path()).unwrap_err(),
            StationConfigError::Json { .. }
        ));

        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_stations(&dir.path().join("missing.json")).unwrap_err(),
            StationConfigError::Io { .. }
        ));
    }
}
