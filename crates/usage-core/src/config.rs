use crate::error::UsageError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level report configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input: InputConfig,
    pub report: ReportSettings,
}

impl ReportConfig {
    /// Load configuration from default path (~/.config/usage-report/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Write current configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("usage-report")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<(), UsageError> {
        if self.report.period == 0 {
            return Err(UsageError::InvalidPeriod(
                "report.period must be a positive number of days".into(),
            ));
        }
        if self.report.features.is_empty() {
            return Err(UsageError::Config(
                "report.features must name at least one feature".into(),
            ));
        }
        Ok(())
    }
}

/// Where telemetry rows are read from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Newline-delimited JSON file of telemetry rows.
    pub path: Option<PathBuf>,
}

/// Aggregation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Trailing window length in days.
    pub period: u32,
    /// Countries broken out next to the "All" row.
    pub countries: Vec<String>,
    /// Features to report on.
    pub features: Vec<FeatureKind>,
    pub format: OutputFormat,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            period: 7,
            countries: Vec::new(),
            features: vec![FeatureKind::Tp, FeatureKind::Etp],
            format: OutputFormat::Json,
        }
    }
}

/// Privacy features with an adoption report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Tracking Protection.
    Tp,
    /// Extended Tracking Protection.
    Etp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Markdown,
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = ReportConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("period = 7"));
        assert!(toml_str.contains("\"etp\""));
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = ReportConfig::default();
        config.report.countries = vec!["DE".into(), "US".into()];
        config.report.format = OutputFormat::Markdown;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ReportConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.report.period, 7);
        assert_eq!(parsed.report.countries, vec!["DE", "US"]);
        assert_eq!(parsed.report.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: ReportConfig = toml::from_str("[report]\nperiod = 28\n").unwrap();
        assert_eq!(parsed.report.period, 28);
        assert_eq!(parsed.report.features, vec![FeatureKind::Tp, FeatureKind::Etp]);
        assert!(parsed.input.path.is_none());
    }

    #[test]
    fn test_load_from_rejects_zero_period() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[report]\nperiod = 0\n").unwrap();
        let err = ReportConfig::load_from(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UsageError>(),
            Some(UsageError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = ReportConfig::default();
        config.input.path = Some(PathBuf::from("/data/main_summary.jsonl"));
        config.report.features = vec![FeatureKind::Etp];
        config.save_to(&path).unwrap();

        let loaded = ReportConfig::load_from(&path).unwrap();
        assert_eq!(loaded.input.path, config.input.path);
        assert_eq!(loaded.report.features, vec![FeatureKind::Etp]);
    }
}
