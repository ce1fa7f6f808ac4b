use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use usage_analytics::{AdoptionQuery, AdoptionTable, FeatureSelector, ReportGenerator};
use usage_core::config::{FeatureKind, OutputFormat, ReportConfig};
use usage_core::source::{parse_period, JsonLinesSource};

#[derive(Parser)]
#[command(
    name = "usage-report",
    about = "Weekly-active-user adoption of privacy features from telemetry",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: ~/.config/usage-report/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute adoption percentages for a reference date
    Run {
        /// Reference date (YYYYMMDD), last day of the window
        #[arg(short, long)]
        date: String,
        /// Newline-delimited JSON telemetry file
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Trailing window length in days
        #[arg(short, long)]
        period: Option<String>,
        /// Country to break out (repeatable)
        #[arg(long = "country")]
        countries: Vec<String>,
        /// Feature to report on (repeatable)
        #[arg(short, long = "feature", value_enum)]
        features: Vec<FeatureArg>,
        /// Output format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Show or manage configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize default configuration file
    Init,
    /// Print config file path
    Path,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeatureArg {
    Tp,
    Etp,
}

impl From<FeatureArg> for FeatureKind {
    fn from(arg: FeatureArg) -> Self {
        match arg {
            FeatureArg::Tp => FeatureKind::Tp,
            FeatureArg::Etp => FeatureKind::Etp,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Markdown,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up tracing.
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "usage_report=info,warn".into()),
        )
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load config.
    let mut config = match &cli.config {
        Some(path) => ReportConfig::load_from(path)?,
        None => ReportConfig::load()?,
    };

    match cli.command {
        Commands::Run {
            date,
            input,
            period,
            countries,
            features,
            format,
        } => {
            // Apply CLI overrides.
            if let Some(path) = input {
                config.input.path = Some(path);
            }
            if let Some(period) = period {
                config.report.period = parse_period(&period)?;
            }
            if !countries.is_empty() {
                config.report.countries = countries;
            }
            if !features.is_empty() {
                config.report.features = features.into_iter().map(Into::into).collect();
            }
            if let Some(format) = format {
                config.report.format = format.into();
            }
            config.validate()?;

            let output = run_report(&config, &date)?;
            println!("{}", output);
        }
        Commands::Config { action } => {
            handle_config_command(action, &config)?;
        }
    }

    Ok(())
}

/// Run every configured feature and render the combined output.
fn run_report(config: &ReportConfig, date: &str) -> Result<String> {
    let Some(path) = &config.input.path else {
        bail!("no input dataset: pass --input or set input.path in the config file");
    };
    let source = JsonLinesSource::new(path);

    tracing::info!(
        "Reporting {} feature(s) for {} over {} days from {}",
        config.report.features.len(),
        date,
        config.report.period,
        path.display(),
    );

    let tables = config
        .report
        .features
        .iter()
        .map(|kind| {
            AdoptionQuery::new(date, FeatureSelector::for_kind(*kind))
                .period(config.report.period)
                .countries(config.report.countries.iter().cloned())
                .run(&source)
                .with_context(|| format!("computing {:?} adoption", kind))
        })
        .collect::<Result<Vec<AdoptionTable>>>()?;

    let output = match config.report.format {
        OutputFormat::Json => serde_json::to_string_pretty(&ReportGenerator::json(&tables))?,
        OutputFormat::Markdown => ReportGenerator::markdown(&tables, date, config.report.period)?,
        OutputFormat::Text => ReportGenerator::text_summary(&tables),
    };
    Ok(output)
}

fn handle_config_command(action: Option<ConfigAction>, config: &ReportConfig) -> Result<()> {
    match action {
        Some(ConfigAction::Show) | None => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
        }
        Some(ConfigAction::Init) => {
            let path = ReportConfig::default_path();
            if path.exists() {
                println!("Config already exists at: {}", path.display());
            } else {
                config.save()?;
                println!("Created default config at: {}", path.display());
            }
        }
        Some(ConfigAction::Path) => {
            println!("{}", ReportConfig::default_path().display());
        }
    }
    Ok(())
}
