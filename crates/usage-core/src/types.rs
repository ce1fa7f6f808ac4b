use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Sparse histogram as recorded by a boolean-like telemetry probe.
///
/// Keys are bucket indexes, values are sample counts for that bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Histogram(BTreeMap<u32, i64>);

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count recorded in `index`, if the bucket is present.
    pub fn bucket(&self, index: u32) -> Option<i64> {
        self.0.get(&index).copied()
    }

    /// Whether the bucket was observed at least once.
    pub fn is_on(&self, index: u32) -> bool {
        self.bucket(index).is_some_and(|count| count > 0)
    }
}

impl<const N: usize> From<[(u32, i64); N]> for Histogram {
    fn from(buckets: [(u32, i64); N]) -> Self {
        Self(buckets.into_iter().collect())
    }
}

impl FromIterator<(u32, i64)> for Histogram {
    fn from_iter<I: IntoIterator<Item = (u32, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Telemetry probes that carry a feature-enabled histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistogramProbe {
    /// `histogram_parent_tracking_protection_enabled`
    TrackingProtectionEnabled,
    /// `histogram_parent_cookie_behavior`
    CookieBehavior,
}

/// Required column whose value may be null. Absent columns still fail.
fn nullable<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Option::<String>::deserialize(deserializer)
}

/// One client session (or subsession) row of the telemetry dataset.
///
/// `submission_date` and `client_id` must be present as columns but may be
/// null; such rows never count toward any group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRow {
    /// Submission date as `YYYYMMDD`.
    #[serde(rename = "submission_date_s3", deserialize_with = "nullable")]
    pub submission_date: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default, rename = "histogram_parent_tracking_protection_enabled")]
    pub tracking_protection_enabled: Option<Histogram>,
    #[serde(default, rename = "histogram_parent_cookie_behavior")]
    pub cookie_behavior: Option<Histogram>,
}

impl TelemetryRow {
    pub fn new(submission_date: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            submission_date: Some(submission_date.into()),
            client_id: Some(client_id.into()),
            country: None,
            tracking_protection_enabled: None,
            cookie_behavior: None,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_histogram(mut self, probe: HistogramProbe, histogram: impl Into<Histogram>) -> Self {
        let histogram = Some(histogram.into());
        match probe {
            HistogramProbe::TrackingProtectionEnabled => self.tracking_protection_enabled = histogram,
            HistogramProbe::CookieBehavior => self.cookie_behavior = histogram,
        }
        self
    }

    /// Histogram recorded for `probe`, `None` when the column is null.
    pub fn histogram(&self, probe: HistogramProbe) -> Option<&Histogram> {
        match probe {
            HistogramProbe::TrackingProtectionEnabled => self.tracking_protection_enabled.as_ref(),
            HistogramProbe::CookieBehavior => self.cookie_behavior.as_ref(),
        }
    }

    /// A null histogram or missing bucket counts as "not observed".
    pub fn feature_on(&self, probe: HistogramProbe, bucket: u32) -> bool {
        self.histogram(probe).is_some_and(|h| h.is_on(bucket))
    }
}
