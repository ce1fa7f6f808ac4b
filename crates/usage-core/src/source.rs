//! Telemetry sources and the trailing date window they are scanned with.
//!
//! A source only has to hand back rows; the aggregator does its own
//! filtering, so a source that cannot push the window down may return every
//! row it has.

use crate::error::{Result, UsageError};
use crate::types::TelemetryRow;
use chrono::{Days, NaiveDate};
use serde_json::error::Category;
use std::path::PathBuf;
use tracing::debug;

/// Date format of `submission_date` and reference dates.
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Half-open trailing window `begin < date <= end` over `YYYYMMDD` strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWindow {
    pub begin: String,
    pub end: String,
}

impl DateWindow {
    /// Window of `period` days ending on (and including) `reference_date`.
    pub fn trailing(reference_date: &str, period: u32) -> Result<Self> {
        if period == 0 {
            return Err(UsageError::InvalidPeriod(
                "period must be a positive number of days".into(),
            ));
        }
        let end = parse_date(reference_date)?;
        let begin = end.checked_sub_days(Days::new(period as u64)).ok_or_else(|| {
            UsageError::InvalidDate(format!(
                "{} days before {} is out of range",
                period, reference_date
            ))
        })?;

        Ok(Self {
            begin: begin.format(DATE_FORMAT).to_string(),
            end: end.format(DATE_FORMAT).to_string(),
        })
    }

    /// Whether a possibly-null submission date falls in the window.
    pub fn contains_row_date(&self, date: Option<&str>) -> bool {
        date.is_some_and(|d| self.contains(d))
    }

    /// Lexical comparison; `YYYYMMDD` sorts chronologically.
    pub fn contains(&self, date: &str) -> bool {
        date > self.begin.as_str() && date <= self.end.as_str()
    }
}

/// Parse a `YYYYMMDD` date string.
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UsageError::InvalidDate(format!(
            "expected YYYYMMDD, got '{}'",
            date
        )));
    }
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| UsageError::InvalidDate(format!("'{}': {}", date, e)))
}

/// Parse a period given as text (CLI flag, env, etc).
pub fn parse_period(period: &str) -> Result<u32> {
    let days: i64 = period
        .trim()
        .parse()
        .map_err(|_| UsageError::InvalidPeriod(format!("'{}' is not an integer", period)))?;
    if days <= 0 {
        return Err(UsageError::InvalidPeriod(format!(
            "{} is not a positive number of days",
            days
        )));
    }
    u32::try_from(days)
        .map_err(|_| UsageError::InvalidPeriod(format!("{} days is too large", days)))
}

/// Read access to a telemetry dataset.
pub trait TelemetrySource {
    /// Source name for logging.
    fn name(&self) -> &str;

    /// Rows relevant to `window`. May return rows outside of it.
    fn scan(&self, window: &DateWindow) -> Result<Vec<TelemetryRow>>;
}

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<TelemetryRow>,
}

impl MemorySource {
    pub fn new(rows: Vec<TelemetryRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl TelemetrySource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn scan(&self, window: &DateWindow) -> Result<Vec<TelemetryRow>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| window.contains_row_date(row.submission_date.as_deref()))
            .cloned()
            .collect())
    }
}

/// Newline-delimited JSON file, one row per line.
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    path: PathBuf,
    name: String,
}

impl JsonLinesSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    /// Decode every row in the file.
    pub fn read_all(&self) -> Result<Vec<TelemetryRow>> {
        let contents = std::fs::read_to_string(&self.path)?;
        let mut rows = Vec::new();

        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: TelemetryRow = serde_json::from_str(line).map_err(|e| match e.classify() {
                Category::Data => UsageError::SchemaMismatch(format!(
                    "{} line {}: {}",
                    self.name,
                    idx + 1,
                    e
                )),
                _ => UsageError::Serialization(e),
            })?;
            rows.push(row);
        }

        Ok(rows)
    }
}

impl TelemetrySource for JsonLinesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self, window: &DateWindow) -> Result<Vec<TelemetryRow>> {
        let rows = self.read_all()?;
        let total = rows.len();
        let rows: Vec<_> = rows
            .into_iter()
            .filter(|row| window.contains_row_date(row.submission_date.as_deref()))
            .collect();
        debug!("Scanned {}: {} of {} rows in window", self.name, rows.len(), total);
        Ok(rows)
    }
}
