//! Feature adoption analytics for telemetry datasets.
//!
//! Computes the share of weekly active clients that had Tracking Protection
//! or Extended Tracking Protection enabled, globally and per country, and
//! renders the results.

pub mod aggregations;
pub mod reports;

pub use aggregations::{
    compute_adoption, pct_etp, pct_tracking_protection, AdoptionQuery, AdoptionRow,
    AdoptionTable, FeatureSelector, ALL_COUNTRIES,
};
pub use reports::ReportGenerator;
