// Cache store for reading and writing metric series.
// Handles CSV encoding, mtime-based staleness, and atomic whole-file writes.

use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;

use crate::error::{PulseError, Result};
use crate::metrics::{DailyCount, MetricKind, MetricSeries};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Read a persisted series, or `None` if the file does not exist.
///
/// The header must match `kind`'s two-column schema.
pub fn load_series(path: &Path, kind: MetricKind) -> Result<Option<MetricSeries>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let expected = kind.columns();
    if headers.len() != 2 || headers.get(0) != Some(expected[0]) || headers.get(1) != Some(expected[1])
    {
        return Err(PulseError::Schema(format!(
            "{}: expected columns {:?}, found {:?}",
            path.display(),
            expected,
            headers.iter().collect::<Vec<_>>()
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let (Some(raw_date), Some(raw_value)) = (record.get(0), record.get(1)) else {
            return Err(PulseError::Schema(format!(
                "{}: short row {:?}",
                path.display(),
                record
            )));
        };
        let date = parse_date(raw_date).ok_or_else(|| {
            PulseError::Schema(format!("{}: bad date {:?}", path.display(), raw_date))
        })?;
        let value = parse_count(raw_value).ok_or_else(|| {
            PulseError::Schema(format!("{}: bad value {:?}", path.display(), raw_value))
        })?;
        rows.push(DailyCount::new(date, value));
    }

    Ok(Some(MetricSeries::from_rows(kind, rows)))
}

/// Write a series, replacing any previous file.
pub fn save_series(path: &Path, series: &MetricSeries) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    // Write atomically via temp file
    let temp_path = path.with_extension("csv.tmp");
    let result = write_csv(&temp_path, series)
        .and_then(|()| fs::rename(&temp_path, path).map_err(PulseError::from));
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn write_csv(path: &Path, series: &MetricSeries) -> Result<()> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    writer.write_record(series.kind().columns())?;
    for row in series.rows() {
        writer.write_record([row.date.format(DATE_FORMAT).to_string(), row.value.to_string()])?;
    }
    let file = writer
        .into_inner()
        .map_err(|e| PulseError::Io(e.into_error()))?;
    file.sync_all()?;
    Ok(())
}

/// Accepts `2024-01-01` and datetime strings starting with a date.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    raw.get(..10)
        .and_then(|day| NaiveDate::parse_from_str(day, DATE_FORMAT).ok())
}

/// Accepts `5` and integral floats such as `5.0`.
fn parse_count(raw: &str) -> Option<u64> {
    if let Ok(value) = raw.parse::<u64>() {
        return Some(value);
    }
    let value = raw.parse::<f64>().ok()?;
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64)
        .then_some(value as u64)
}

/// Get the modification time of a cache file.
pub fn modified_at(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Staleness rule: older than `threshold` is stale, exactly `threshold` is not.
pub fn is_stale_at(modified: SystemTime, now: SystemTime, threshold: Duration) -> bool {
    now.duration_since(modified).unwrap_or(Duration::ZERO) > threshold
}

/// Whether the file at `path` is missing or older than `threshold`.
pub fn is_stale(path: &Path, threshold: Duration) -> bool {
    match modified_at(path) {
        Ok(modified) => is_stale_at(modified, SystemTime::now(), threshold),
        Err(_) => true,
    }
}

/// Delete a cached file.
pub fn delete(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

/// Delete a cached directory and all contents.
pub fn delete_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)?;
    }
    Ok(())
}
