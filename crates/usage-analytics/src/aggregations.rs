//! Weekly-active-user feature adoption.
//!
//! For a reference date and trailing window, computes the share of distinct
//! clients that had a privacy feature enabled at least once, for all clients
//! and per requested country.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use usage_core::config::FeatureKind;
use usage_core::error::Result;
use usage_core::source::{DateWindow, TelemetrySource};
use usage_core::types::{HistogramProbe, TelemetryRow};

/// Country key of the aggregate over every client.
pub const ALL_COUNTRIES: &str = "All";

/// Default trailing window, in days.
pub const DEFAULT_PERIOD: u32 = 7;

/// Which histogram bucket marks a feature as enabled, and the name of the
/// resulting percentage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureSelector {
    pub probe: HistogramProbe,
    pub bucket: u32,
    pub column: &'static str,
}

impl FeatureSelector {
    pub const TRACKING_PROTECTION: Self = Self {
        probe: HistogramProbe::TrackingProtectionEnabled,
        bucket: 1,
        column: "pct_TP",
    };

    pub const EXTENDED_TRACKING_PROTECTION: Self = Self {
        probe: HistogramProbe::CookieBehavior,
        bucket: 4,
        column: "pct_ETP",
    };

    pub fn for_kind(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Tp => Self::TRACKING_PROTECTION,
            FeatureKind::Etp => Self::EXTENDED_TRACKING_PROTECTION,
        }
    }

    fn is_on(&self, row: &TelemetryRow) -> bool {
        row.feature_on(self.probe, self.bucket)
    }
}

/// One output row: adoption percentage for a country on the reference date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdoptionRow {
    #[serde(rename = "submission_date_s3")]
    pub submission_date: String,
    pub country: String,
    pub pct: f64,
}

/// Result of one adoption computation.
///
/// Row order is unspecified; use [`AdoptionTable::sorted`] for display.
#[derive(Debug, Clone, PartialEq)]
pub struct AdoptionTable {
    /// Name of the percentage column (`pct_TP`, `pct_ETP`).
    pub column: String,
    pub rows: Vec<AdoptionRow>,
}

impl AdoptionTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Percentage for `country`, if it has a row.
    pub fn get(&self, country: &str) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| r.country == country)
            .map(|r| r.pct)
    }

    /// Rows with "All" first, then countries in ascending order.
    pub fn sorted(&self) -> Vec<&AdoptionRow> {
        let mut rows: Vec<_> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            (a.country != ALL_COUNTRIES, &a.country).cmp(&(b.country != ALL_COUNTRIES, &b.country))
        });
        rows
    }

    /// Rows as records keyed by the public column names:
    /// `submission_date_s3`, `country`, and the percentage column.
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        self.sorted()
            .into_iter()
            .map(|row| {
                let mut record = serde_json::Map::new();
                record.insert(
                    "submission_date_s3".into(),
                    serde_json::Value::from(row.submission_date.clone()),
                );
                record.insert("country".into(), serde_json::Value::from(row.country.clone()));
                record.insert(self.column.clone(), serde_json::Value::from(row.pct));
                serde_json::Value::Object(record)
            })
            .collect()
    }
}

/// Parameters of one adoption computation.
#[derive(Debug, Clone)]
pub struct AdoptionQuery {
    reference_date: String,
    feature: FeatureSelector,
    period: u32,
    countries: Vec<String>,
}

impl AdoptionQuery {
    pub fn new(reference_date: impl Into<String>, feature: FeatureSelector) -> Self {
        Self {
            reference_date: reference_date.into(),
            feature,
            period: DEFAULT_PERIOD,
            countries: Vec::new(),
        }
    }

    /// Trailing window length in days.
    pub fn period(mut self, days: u32) -> Self {
        self.period = days;
        self
    }

    /// Countries to break out next to "All".
    pub fn countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.countries = countries.into_iter().map(Into::into).collect();
        self
    }

    /// Validated window for this query.
    pub fn window(&self) -> Result<DateWindow> {
        DateWindow::trailing(&self.reference_date, self.period)
    }

    /// Validate parameters, scan `source`, and aggregate.
    pub fn run<S: TelemetrySource + ?Sized>(&self, source: &S) -> Result<AdoptionTable> {
        let window = self.window()?;
        debug!(
            "Computing {} over ({}, {}] from {}",
            self.feature.column,
            window.begin,
            window.end,
            source.name()
        );

        let rows = source.scan(&window)?;
        let table = aggregate(&rows, &window, &self.feature, &self.countries);

        info!(
            "{} for {}: {} rows from {} telemetry rows",
            self.feature.column,
            window.end,
            table.len(),
            rows.len()
        );
        Ok(table)
    }
}

/// Compute adoption of `feature` over the `period` days ending on
/// `reference_date` (`YYYYMMDD`), globally and for each of `country_list`.
pub fn compute_adoption<S: TelemetrySource + ?Sized>(
    source: &S,
    reference_date: &str,
    feature: FeatureSelector,
    period: u32,
    country_list: Option<&[String]>,
) -> Result<AdoptionTable> {
    AdoptionQuery::new(reference_date, feature)
        .period(period)
        .countries(country_list.unwrap_or_default().iter().cloned())
        .run(source)
}

/// Tracking Protection adoption (`pct_TP`).
pub fn pct_tracking_protection<S: TelemetrySource + ?Sized>(
    source: &S,
    reference_date: &str,
    period: u32,
    country_list: Option<&[String]>,
) -> Result<AdoptionTable> {
    compute_adoption(
        source,
        reference_date,
        FeatureSelector::TRACKING_PROTECTION,
        period,
        country_list,
    )
}

/// Extended Tracking Protection adoption (`pct_ETP`).
pub fn pct_etp<S: TelemetrySource + ?Sized>(
    source: &S,
    reference_date: &str,
    period: u32,
    country_list: Option<&[String]>,
) -> Result<AdoptionTable> {
    compute_adoption(
        source,
        reference_date,
        FeatureSelector::EXTENDED_TRACKING_PROTECTION,
        period,
        country_list,
    )
}

/// A row projected into a country cohort.
struct CohortRow<'a> {
    submission_date: &'a str,
    client_id: &'a str,
    feature_on: bool,
    country: &'a str,
}

/// Rows with a non-null date and client id, alongside those keys.
fn keyed_rows(rows: &[TelemetryRow]) -> impl Iterator<Item = (&TelemetryRow, &str, &str)> {
    rows.iter().filter_map(|row| {
        let date = row.submission_date.as_deref()?;
        let client = row.client_id.as_deref()?;
        Some((row, date, client))
    })
}

/// Project `rows` into the "All" cohort plus, when `countries` is non-empty,
/// a cohort per listed country. A listed country's rows land in both.
/// Rows with a null date or client id are dropped from every cohort.
fn project_cohorts<'a>(
    rows: &'a [TelemetryRow],
    feature: &FeatureSelector,
    countries: &[String],
) -> Vec<CohortRow<'a>> {
    let global = keyed_rows(rows).map(|(row, submission_date, client_id)| CohortRow {
        submission_date,
        client_id,
        feature_on: feature.is_on(row),
        country: ALL_COUNTRIES,
    });

    let by_country = keyed_rows(rows).filter_map(|(row, submission_date, client_id)| {
        let country = row.country.as_deref()?;
        if !countries.iter().any(|c| c == country) {
            return None;
        }
        Some(CohortRow {
            submission_date,
            client_id,
            feature_on: feature.is_on(row),
            country,
        })
    });

    global.chain(by_country).collect()
}

/// Distinct clients per country key.
fn distinct_users<'r, 'a: 'r>(
    cohort: impl Iterator<Item = &'r CohortRow<'a>>,
) -> HashMap<&'a str, usize> {
    let mut users: HashMap<&str, HashSet<&str>> = HashMap::new();
    for row in cohort {
        users.entry(row.country).or_default().insert(row.client_id);
    }
    users
        .into_iter()
        .map(|(country, clients)| (country, clients.len()))
        .collect()
}

/// Aggregate already-loaded rows. Rows outside `window` are ignored.
pub fn aggregate(
    rows: &[TelemetryRow],
    window: &DateWindow,
    feature: &FeatureSelector,
    countries: &[String],
) -> AdoptionTable {
    let cohort: Vec<_> = project_cohorts(rows, feature, countries)
        .into_iter()
        .filter(|row| window.contains(row.submission_date))
        .collect();
    debug!("{} cohort rows in window", cohort.len());

    let total = distinct_users(cohort.iter());
    let feature_total = distinct_users(cohort.iter().filter(|row| row.feature_on));

    // Left join: every country with users appears, even with no adopters.
    let output = total
        .iter()
        .map(|(country, &users)| {
            let adopters = feature_total.get(country).copied().unwrap_or(0);
            let pct = if users == 0 {
                0.0
            } else {
                100.0 * adopters as f64 / users as f64
            };
            AdoptionRow {
                submission_date: window.end.clone(),
                country: (*country).to_string(),
                pct,
            }
        })
        .collect();

    AdoptionTable {
        column: feature.column.to_string(),
        rows: output,
    }
}
