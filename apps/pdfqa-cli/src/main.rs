//! pdfqa command-line front end
//!
//! Analyzes one PDF, prints the report, optionally writes it as JSON and
//! exits with the status the run policy picks for the calling context.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use pdfqa_core::{
    AnalysisReport, Analyzer, AnalyzerConfig, OutputFormat, Reporter, RunContext, RunPolicy,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "pdfqa")]
#[command(version, about = "Static QA checks for generated PDFs")]
struct Args {
    /// PDF to analyze
    pdf: PathBuf,

    /// Calling context: hook, manual or ci
    #[arg(long)]
    run_context: Option<RunContext>,

    /// Check internal and external links
    #[arg(long)]
    check_links: bool,

    /// With --check-links, skip probing http(s) links
    #[arg(long)]
    no_external_links: bool,

    /// Skip table cell overflow checks
    #[arg(long)]
    no_cells: bool,

    /// Points a glyph may extend past a cell edge
    #[arg(long)]
    cell_tolerance: Option<f64>,

    /// External link timeout in seconds
    #[arg(long)]
    link_timeout: Option<f64>,

    /// TOML config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the report as JSON to this path
    #[arg(long)]
    json: Option<PathBuf>,

    /// Format of the report printed to stdout
    #[arg(long, value_enum, default_value = "text")]
    format: Format,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::JsonPretty,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Reports go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}", e);
            let context = args.run_context.unwrap_or_default();
            return exit_with(RunPolicy::on_fault(context).exit_code());
        }
    };

    let outcome = match run(&args, &config) {
        Ok(report) => RunPolicy::decide(config.run_context, report.has_errors()),
        Err(e) => {
            tracing::error!("{:#}", e);
            let outcome = RunPolicy::on_fault(config.run_context);
            if !outcome.is_failure() {
                tracing::warn!(
                    "Analysis failed in {} context; not blocking",
                    config.run_context
                );
            }
            outcome
        }
    };

    exit_with(outcome.exit_code())
}

fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Config file (if any) with command-line flags laid over it
fn load_config(args: &Args) -> Result<AnalyzerConfig> {
    let mut config = match &args.config {
        Some(path) => AnalyzerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyzerConfig::default(),
    };

    if let Some(context) = args.run_context {
        config.run_context = context;
    }
    if args.check_links {
        config.check_links = true;
    }
    if args.no_external_links {
        config.check_external_links = false;
    }
    if args.no_cells {
        config.check_cells = false;
    }
    if let Some(tolerance) = args.cell_tolerance {
        config.cell_tolerance = tolerance;
    }
    if let Some(secs) = args.link_timeout {
        config.link_timeout = Duration::try_from_secs_f64(secs)
            .with_context(|| format!("Invalid --link-timeout {}", secs))?;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run(args: &Args, config: &AnalyzerConfig) -> Result<AnalysisReport> {
    let report = Analyzer::new(config.clone())
        .analyze(&args.pdf)
        .with_context(|| format!("Failed to analyze {}", args.pdf.display()))?;

    if let Some(path) = &args.json {
        Reporter::new(OutputFormat::JsonPretty)
            .write_to_file(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    let output = Reporter::new(args.format.into()).format(&report)?;
    println!("{}", output.trim_end());
    Ok(report)
}
