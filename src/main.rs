use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::{error, info, warn};

use translation_review::config::AppConfig;
use translation_review::extract::read_header_row;
use translation_review::file_writer::{results_needing_review, write_results, write_results_to_file};
use translation_review::logging::init_logging;
use translation_review::metrics::MetricsCollector;
use translation_review::openai::AssistantClient;
use translation_review::service::{extract_into, ReviewService};
use translation_review::validation::InputValidator;
use translation_review::{OutputFormat, ResultStore};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the next batch of unscored entries
    Ai {
        /// Number of entries to send; defaults to ai.batch_size
        count: Option<usize>,
    },
    /// Extract entries from the configured spreadsheet exports
    Extract,
    /// List results that scored below 5
    Print {
        /// Output format (json, csv or txt)
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the header row of every configured workbook
    Headers,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse first so usage errors reach stderr before any setup
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize logging; the guard flushes the log file on exit
    let log_file = config.logging.file_path.as_ref().map(PathBuf::from);
    let _log_guard = init_logging(Some(&config.get_log_level()), log_file.as_deref())?;

    info!("Starting translation-review");

    match cli.command {
        Commands::Ai { count } => score_batch(&config, count.unwrap_or(config.ai.batch_size)).await?,
        Commands::Extract => extract_entries(&config).await?,
        Commands::Print { format, output } => print_review(&config, format, output.as_deref())?,
        Commands::Headers => print_headers(&config)?,
    }

    Ok(())
}

fn open_store(config: &AppConfig) -> Result<ResultStore> {
    let mut store = ResultStore::in_dir(&config.working_dir());
    store.load().context("Failed to load the working store")?;
    Ok(store)
}

/// One scoring pass
async fn score_batch(config: &AppConfig, count: usize) -> Result<()> {
    let mut store = open_store(config)?;

    let api_key = config.get_api_key()?;
    let client = AssistantClient::new(config.ai.clone(), api_key)?;
    let mut service = ReviewService::new(client, config.ai.clone(), &config.out_dir());

    let outcome = service.run_batch(&mut store, count).await;
    info!("{}", service.metrics().get_summary());

    match outcome {
        Ok(outcome) if outcome.submitted == 0 => {
            info!("Nothing left to score");
        }
        Ok(outcome) => {
            info!(
                submitted = outcome.submitted,
                merged = outcome.report.merged,
                drifted = outcome.report.drifted,
                cost = outcome.cost,
                "Scoring pass complete"
            );
        }
        Err(e) => {
            error!(error = %e, "Scoring pass failed");
            return Err(e).context("Scoring pass failed");
        }
    }

    Ok(())
}

/// Extract all workbooks into the working store
async fn extract_entries(config: &AppConfig) -> Result<()> {
    let mut store = open_store(config)?;
    let mut metrics = MetricsCollector::default();

    let extracted = extract_into(&mut store, &config.extract, &config.extracts_dir(), &mut metrics)
        .await
        .context("Extraction failed")?;

    info!(records = extracted, "Extraction complete");
    info!("{}", metrics.get_summary());
    Ok(())
}

/// Write the review report
fn print_review(config: &AppConfig, format: OutputFormat, output: Option<&std::path::Path>) -> Result<()> {
    let store = open_store(config)?;
    let review = results_needing_review(store.results());
    info!(count = review.len(), "Results needing review");

    match output {
        Some(path) => {
            InputValidator::validate_file_path(path)?;
            write_results_to_file(&review, format, path)?;
            info!(path = %path.display(), "Report written");
        }
        None => write_results(&review, format, std::io::stdout().lock())?,
    }
    Ok(())
}

/// Print the header row of each enabled workbook
fn print_headers(config: &AppConfig) -> Result<()> {
    let extracts_dir = config.extracts_dir();
    let mut stdout = std::io::stdout().lock();

    for def in config.extract.sheets.iter().filter(|def| !def.disabled) {
        match read_header_row(def, &extracts_dir, &config.extract.default_sheet_name) {
            Ok(Some(header)) => {
                writeln!(stdout, "{}", def.out_file)?;
                for column in &def.headers {
                    let text = header.get(column).map_or("<empty>", String::as_str);
                    writeln!(stdout, "  {column}: {text}")?;
                }
            }
            Ok(None) => warn!(sheet = %def.out_file, "No header row found"),
            Err(e) => error!(sheet = %def.out_file, error = %e, "Could not read workbook"),
        }
    }
    Ok(())
}
