use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::types::{PositionRecord, Sample};

const FILE_PREFIX: &str = "positions-";
const FILE_EXT: &str = ".json";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Position history, partitioned by calendar day.
///
/// Buckets are keyed by `yyyy-MM-dd` (UTC) and hold records in sampling
/// order. Each bucket persists as one `positions-<date>.json` file; a day's
/// history is a self-contained unit on disk.
#[derive(Debug, Default)]
pub struct PositionStore {
    buckets: HashMap<String, Vec<PositionRecord>>,
}

impl PositionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one batch of samples under `now`'s calendar date, creating
    /// the bucket on the first record of a new day.
    ///
    /// Samples with an empty uid or non-finite coordinates are dropped
    /// individually; the rest of the batch still lands. Every record in the
    /// batch carries the same capture instant.
    pub fn record_batch(&mut self, now: DateTime<Utc>, samples: &[Sample]) {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let records: Vec<PositionRecord> = samples
            .iter()
            .filter(|s| !s.player_uid.is_empty() && s.x.is_finite() && s.y.is_finite() && s.z.is_finite())
            .map(|s| PositionRecord {
                timestamp: timestamp.clone(),
                player_uid: s.player_uid.clone(),
                x: round1(s.x),
                y: round1(s.y),
                z: round1(s.z),
                yaw: s.yaw,
            })
            .collect();
        if records.is_empty() {
            return;
        }
        let date_key = now.format(DATE_FORMAT).to_string();
        self.buckets.entry(date_key).or_default().extend(records);
    }

    /// All date keys with history, ascending. Lexical order equals
    /// chronological order for this key format.
    pub fn available_dates(&self) -> Vec<String> {
        let mut dates: Vec<String> = self.buckets.keys().cloned().collect();
        dates.sort();
        dates
    }

    /// The records for one date in insertion order. An unknown date is an
    /// empty day, not an error.
    pub fn records_for(&self, date: &str) -> &[PositionRecord] {
        self.buckets.get(date).map_or(&[], Vec::as_slice)
    }

    pub fn day_count(&self) -> usize {
        self.buckets.len()
    }

    /// Replaces the in-memory history with the contents of `dir`.
    ///
    /// Files that don't look like `positions-<yyyy-MM-dd>.json` are ignored;
    /// a file that can't be read or parsed is skipped with an error log and
    /// the remaining days still load.
    pub fn load_from_dir(&mut self, dir: &Path) -> io::Result<()> {
        self.buckets.clear();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else { continue };
            let Some(date_key) = name.strip_prefix(FILE_PREFIX).and_then(|n| n.strip_suffix(FILE_EXT)) else {
                continue;
            };
            if NaiveDate::parse_from_str(date_key, DATE_FORMAT).is_err() {
                log::warn!("ignoring {name}: file name does not carry a calendar date");
                continue;
            }
            match read_day(&entry.path()) {
                Ok(records) => {
                    self.buckets.insert(date_key.to_owned(), records);
                }
                Err(e) => log::error!("failed to load position data from {}: {e}", entry.path().display()),
            }
        }
        log::debug!("loaded position data for {} days", self.buckets.len());
        Ok(())
    }

    /// Writes every bucket to its own file, overwriting prior contents. A
    /// failed write is logged and does not stop the other days.
    pub fn save_to_dir(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)?;
        for (date_key, records) in &self.buckets {
            let path = dir.join(format!("{FILE_PREFIX}{date_key}{FILE_EXT}"));
            if let Err(e) = write_day(&path, records) {
                log::error!("failed to save position data to {}: {e}", path.display());
            }
        }
        log::debug!("saved position data for {} days", self.buckets.len());
        Ok(())
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn read_day(path: &Path) -> io::Result<Vec<PositionRecord>> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

fn write_day(path: &Path, records: &[PositionRecord]) -> io::Result<()> {
    fs::write(path, serde_json::to_vec(records)?)
}
