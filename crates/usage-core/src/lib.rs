pub mod config;
pub mod error;
pub mod source;
pub mod types;

pub use config::{FeatureKind, OutputFormat, ReportConfig};
pub use error::UsageError;
pub use source::{DateWindow, JsonLinesSource, MemorySource, TelemetrySource};
pub use types::{Histogram, HistogramProbe, TelemetryRow};
