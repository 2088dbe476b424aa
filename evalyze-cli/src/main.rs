//! Evalyze CLI: review LLM benchmark result files from the terminal.
//!
//! One `.json` file is shown as a run summary and one `.jsonl` file as a
//! single run. Several `.jsonl` files are aggregated as repeated runs of
//! the same question set.

mod commands;
mod report;

use clap::Parser;
use evalyze_core::aggregate::StreamSummary;
use evalyze_core::config::{AnalyzerConfig, DisplayConfig, PAGE_SIZE_CHOICES};
use evalyze_core::query::{QueryItem, QueryPage, SortKey, clamp_page, query};
use evalyze_core::session::{Analysis, BatchReport, FileFailure, analyze};
use evalyze_core::Artifact;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Evalyze: review and aggregate LLM benchmark results
#[derive(Parser, Debug)]
#[command(name = "evalyze", version, about, long_about = None)]
struct Cli {
    /// Result files: one .json run summary, or one or more .jsonl run files
    files: Vec<PathBuf>,

    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page to show (clamped to the available pages)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Items per page: 10, 20, 50 or 100
    #[arg(long, value_parser = parse_page_size)]
    page_size: Option<usize>,

    /// Sort order
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Lowest score to show (0-100)
    #[arg(long)]
    min_score: Option<f64>,

    /// Highest score to show (0-100)
    #[arg(long)]
    max_score: Option<f64>,

    /// Also page through every per-run record when aggregating
    #[arg(long)]
    individual: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

fn parse_page_size(value: &str) -> Result<usize, String> {
    let size: usize = value.parse().map_err(|e| format!("{e}"))?;
    if PAGE_SIZE_CHOICES.contains(&size) {
        Ok(size)
    } else {
        Err(format!("expected one of {PAGE_SIZE_CHOICES:?}"))
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortArg {
    /// By question id
    Id,
    /// Lowest score first
    ScoreAsc,
    /// Highest score first
    ScoreDesc,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Id => SortKey::ById,
            SortArg::ScoreAsc => SortKey::ByScoreAsc,
            SortArg::ScoreDesc => SortKey::ByScoreDesc,
        }
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file
    Init,
    /// Show the current configuration
    Show,
}

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "evalyze", "evalyze")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "evalyze.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Some(command) = cli.command {
        return commands::handle_command(command, &workspace, cli.config.as_deref());
    }

    let mut config = evalyze_core::load_config(Some(&workspace), cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    if cli.files.is_empty() {
        anyhow::bail!(
            "No result files given. Pass one results_*.json file or one or more *.jsonl run files."
        );
    }

    let outcome = load_and_analyze(&cli.files, &config);
    if !outcome.failures.is_empty() && !cli.quiet {
        eprint!("{}", report::render_failures(&outcome.failures));
    }
    let (analysis, _) = outcome.into_analysis()?;

    let output = render(&analysis, &config.display, cli.page, cli.json)?;
    print!("{}", output);
    Ok(())
}

/// Command-line flags take precedence over every configuration layer.
fn apply_overrides(config: &mut AnalyzerConfig, cli: &Cli) {
    let display = &mut config.display;
    if let Some(page_size) = cli.page_size {
        display.page_size = page_size;
    }
    if let Some(sort) = cli.sort {
        display.sort = sort.into();
    }
    if let Some(low) = cli.min_score {
        display.score_low = low;
    }
    if let Some(high) = cli.max_score {
        display.score_high = high;
    }
    if cli.individual {
        display.show_individual = true;
    }
}

/// Read every file, then analyze the readable ones as one batch.
fn load_and_analyze(files: &[PathBuf], config: &AnalyzerConfig) -> BatchReport {
    let mut artifacts = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for path in files {
        match Artifact::read(path, &config.limits) {
            Ok(artifact) => artifacts.push(artifact),
            Err(error) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %error,
                    "Could not read result file"
                );
                failures.push(FileFailure {
                    file_name: file_label(path),
                    error,
                });
            }
        }
    }

    let batch = analyze(&artifacts);
    failures.extend(batch.failures);
    BatchReport {
        analysis: batch.analysis,
        failures,
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Query with the configured display settings, clamping the page into range.
fn query_page<'a, T: QueryItem>(
    items: &'a [T],
    display: &DisplayConfig,
    page: usize,
) -> anyhow::Result<QueryPage<'a, T>> {
    let first = query(items, &display.query_params(1)?)?;
    let clamped = clamp_page(page, first.total_pages);
    if clamped != page {
        tracing::info!(requested = page, shown = clamped, "Page out of range; clamped");
    }
    if clamped == 1 {
        return Ok(first);
    }
    Ok(query(items, &display.query_params(clamped)?)?)
}

fn render(
    analysis: &Analysis,
    display: &DisplayConfig,
    page: usize,
    json: bool,
) -> anyhow::Result<String> {
    let range = display.score_range()?;
    match analysis {
        Analysis::Summary(summary) => {
            if json {
                return Ok(serde_json::to_string_pretty(summary)? + "\n");
            }
            Ok(report::render_summary(summary))
        }
        Analysis::SingleRun { file_name, records } => {
            let summary = StreamSummary::of(records);
            let records_page = query_page(records, display, page)?;
            if json {
                let view = report::SingleRunView {
                    file_name,
                    summary,
                    records: records_page,
                };
                return Ok(serde_json::to_string_pretty(&view)? + "\n");
            }
            let mut text = report::render_stream_header(file_name, &summary);
            text.push_str(&report::render_record_page(&records_page, range));
            Ok(text)
        }
        Analysis::MultiRun(result) => {
            let questions = query_page(&result.aggregated_questions, display, page)?;
            let individual = if display.show_individual {
                Some(query_page(&result.individual_records, display, page)?)
            } else {
                None
            };
            if json {
                let view = report::MultiRunView::new(result, questions, individual);
                return Ok(serde_json::to_string_pretty(&view)? + "\n");
            }

            let mut text = report::render_aggregation_header(result);
            text.push_str("Per-question results across runs\n");
            text.push_str(&report::render_question_page(&questions, range));
            if let Some(records) = individual {
                text.push_str(&format!("\n{}\nAll individual results\n", "=".repeat(40)));
                text.push_str(&report::render_record_page(&records, range));
            }
            Ok(text)
        }
    }
}
