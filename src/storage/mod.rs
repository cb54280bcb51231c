use crate::config::WriteMode;
use crate::models::{HISTORY_HEADER, HistoryRow, Observation};
use chrono::NaiveDate;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Bytes inspected when deciding whether an existing file is still blank.
const BLANK_CHECK_LEN: u64 = 4096;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV error in {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

// ── History store ─────────────────────────────────────────────────────────────

/// The on-disk price history: a BOM-prefixed UTF-8 CSV with a fixed header.
/// Rows are only ever added; no concurrent writer is expected.
pub struct HistoryStore {
    path: PathBuf,
    mode: WriteMode,
}

#[derive(Debug, Default, PartialEq)]
pub struct HistorySummary {
    pub rows: usize,
    pub missing_prices: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

impl HistoryStore {
    pub fn open(path: &Path, mode: WriteMode) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            mode,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add a batch of observations after the existing rows. An empty batch
    /// does not touch the file at all.
    pub fn append(&self, observations: &[Observation]) -> Result<usize, StorageError> {
        if observations.is_empty() {
            debug!("Nothing to write to {:?}", self.path);
            return Ok(0);
        }

        let new_rows: Vec<HistoryRow> = observations.iter().map(HistoryRow::from).collect();

        match self.mode {
            WriteMode::Rewrite => {
                let existed = self.path.exists();
                let mut rows = self.read_all()?;
                let kept = rows.len();
                rows.extend(new_rows);
                self.rewrite(&rows)?;
                if existed {
                    info!("Appended {} rows to {:?} ({} kept)", observations.len(), self.path, kept);
                } else {
                    info!("Created {:?} with {} rows", self.path, observations.len());
                }
            }
            WriteMode::Append => {
                self.append_rows(&new_rows)?;
                info!("Appended {} rows to {:?}", observations.len(), self.path);
            }
        }

        Ok(observations.len())
    }

    /// All stored rows in file order. A missing or zero-length file is an
    /// empty history.
    pub fn read_all(&self) -> Result<Vec<HistoryRow>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(source) => return Err(self.io_err(source)),
        };

        let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes.as_slice());
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(vec![]);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(body);

        reader
            .deserialize::<HistoryRow>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.csv_err(e))
    }

    pub fn summary(&self) -> Result<HistorySummary, StorageError> {
        let rows = self.read_all()?;
        let dates: Vec<NaiveDate> = rows.iter().filter_map(HistoryRow::date_value).collect();
        Ok(HistorySummary {
            rows: rows.len(),
            missing_prices: rows.iter().filter(|r| r.price_value().is_none()).count(),
            first_date: dates.iter().min().copied(),
            last_date: dates.iter().max().copied(),
        })
    }

    // ── Writers ───────────────────────────────────────────────────────────────

    /// Write the full history to a sibling temp file, then swap it in.
    fn rewrite(&self, rows: &[HistoryRow]) -> Result<(), StorageError> {
        let tmp = self.temp_path();
        let file = File::create(&tmp).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;

        let swapped = self
            .write_rows(file, rows, true)
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(|e| self.io_err(e)));
        if swapped.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        swapped
    }

    /// Add rows at the end of the file. A file holding nothing but a BOM or
    /// whitespace is started over with a header; a last row missing its line
    /// terminator gets one before the new rows.
    fn append_rows(&self, rows: &[HistoryRow]) -> Result<(), StorageError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_err(e))?;

        let len = file.metadata().map_err(|e| self.io_err(e))?.len();
        let mut head = Vec::new();
        (&mut file)
            .take(BLANK_CHECK_LEN)
            .read_to_end(&mut head)
            .map_err(|e| self.io_err(e))?;

        let body = head.strip_prefix(UTF8_BOM).unwrap_or(head.as_slice());
        if len == head.len() as u64 && body.iter().all(u8::is_ascii_whitespace) {
            file.set_len(0).map_err(|e| self.io_err(e))?;
            return self.write_rows(file, rows, true);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|e| self.io_err(e))?;
        if last[0] != b'\n' {
            file.write_all(b"\n").map_err(|e| self.io_err(e))?;
        }
        self.write_rows(file, rows, false)
    }

    fn write_rows(&self, mut file: File, rows: &[HistoryRow], with_header: bool) -> Result<(), StorageError> {
        if with_header {
            file.write_all(UTF8_BOM).map_err(|e| self.io_err(e))?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if with_header {
            writer.write_record(HISTORY_HEADER).map_err(|e| self.csv_err(e))?;
        }
        for row in rows {
            writer.serialize(row).map_err(|e| self.csv_err(e))?;
        }

        let file = writer
            .into_inner()
            .map_err(|e| self.io_err(e.into_error()))?;
        file.sync_all().map_err(|e| self.io_err(e))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_err(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn csv_err(&self, source: csv::Error) -> StorageError {
        StorageError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
