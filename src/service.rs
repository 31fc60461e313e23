//! One scoring pass: select a batch, send it, stream the run, merge the answer.

use crate::config::{AiConfig, ExtractConfig};
use crate::error::{Result, ReviewError};
use crate::extract::extract_all;
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::AiResponse;
use crate::prompt::scoring_request;
use crate::session::{drive, extract_fenced_payload, ScoringSession, SessionFiles, SessionId, SessionRecorder, Usage};
use crate::store::{write_json, MergeReport, ResultStore};
use crate::validation::InputValidator;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// What a scoring pass did
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    /// Session the batch was sent in, `None` when there was nothing to send
    pub session: Option<SessionId>,
    /// Entries sent
    pub submitted: usize,
    /// Terminal run status
    pub status: Option<String>,
    /// Token usage of the run
    pub usage: Option<Usage>,
    /// Estimated cost of the run
    pub cost: f64,
    /// Merge summary
    pub report: MergeReport,
}

/// Drives scoring passes against a `ScoringSession`
pub struct ReviewService<S: ScoringSession> {
    session: S,
    config: AiConfig,
    out_dir: PathBuf,
    metrics: MetricsCollector,
}

impl<S: ScoringSession> ReviewService<S> {
    /// Create a service that writes session side files under `out_dir`
    pub fn new(session: S, config: AiConfig, out_dir: &Path) -> Self {
        Self {
            session,
            config,
            out_dir: out_dir.to_path_buf(),
            metrics: MetricsCollector::default(),
        }
    }

    /// Tallies recorded by this service so far
    pub const fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Score up to `count` entries that have no result yet and save the merged results.
    ///
    /// Nothing is merged unless the run completes and its whole payload parses
    /// and validates.
    pub async fn run_batch(&mut self, store: &mut ResultStore, count: usize) -> Result<BatchOutcome> {
        InputValidator::validate_batch_size(count, self.config.max_batch_size)?;

        let batch = store.next_ai_request_set(count);
        if batch.is_empty() {
            info!("No unscored candidates left");
            return Ok(BatchOutcome {
                session: None,
                submitted: 0,
                status: None,
                usage: None,
                cost: 0.0,
                report: MergeReport::default(),
            });
        }
        // numbers must survive a restart before the batch leaves the process
        store.save_key_map()?;

        let session = self.session.create_session().await?;
        info!(session_id = %session, entries = batch.len(), "Commencing scoring session");
        let timer = OperationTimer::new("scoring_run");

        let files = SessionFiles::new(&self.out_dir, &session);
        let request = scoring_request(&batch)?;
        tokio::fs::create_dir_all(&self.out_dir).await?;
        tokio::fs::write(files.input(), &request).await?;

        self.session.post_message(&session, &request).await?;
        self.metrics.record_batch_submitted(batch.len());

        let recorder = SessionRecorder::start(files.clone(), self.config.echo_stream).await?;
        let events = self.session.run(&session).await?;
        let completion = drive(events, recorder).await?;
        tokio::fs::write(files.response(), &completion.text).await?;

        self.metrics.record_run(&completion.status, completion.usage, timer.elapsed());
        let cost = completion
            .usage
            .map_or(0.0, |u| u.cost(self.config.input_cost_per_1k, self.config.output_cost_per_1k));
        info!(
            session_id = %session,
            status = %completion.status,
            tokens = completion.usage.map_or(0, |u| u.total_tokens),
            cost,
            "Scoring session finished"
        );
        timer.finish();

        if !completion.is_completed() {
            error!(session_id = %session, status = %completion.status, "Run did not complete, nothing merged");
            self.metrics.record_error("run_status", "scoring");
            return Err(ReviewError::RunNotCompleted {
                status: completion.status,
            });
        }

        let responses = match parse_responses(&completion.text) {
            Ok(responses) => responses,
            Err(e) => {
                self.metrics.record_error("parse", "scoring");
                return Err(e);
            }
        };
        write_json(&files.parsed(), &responses)?;

        let report = store.add_ai_responses(responses);
        self.metrics.record_merge(&report);
        if !report.unresolved.is_empty() {
            warn!(session_id = %session, keys = ?report.unresolved, "Some responses could not be matched to an entry");
        }
        store.save_results()?;
        info!(
            session_id = %session,
            merged = report.merged,
            drifted = report.drifted,
            unresolved = report.unresolved.len(),
            "Results merged"
        );

        Ok(BatchOutcome {
            session: Some(session),
            submitted: batch.len(),
            status: Some(completion.status),
            usage: completion.usage,
            cost,
            report,
        })
    }
}

/// Extract every enabled workbook into `store` and persist entries and corpus.
///
/// Batches are merged in the order the workbooks are declared, so a later
/// workbook wins when two define the same natural key.
pub async fn extract_into(
    store: &mut ResultStore,
    config: &ExtractConfig,
    extracts_dir: &Path,
    metrics: &mut MetricsCollector,
) -> Result<usize> {
    let timer = OperationTimer::new("extraction");
    for def in config.sheets.iter().filter(|def| !def.disabled) {
        InputValidator::validate_sheet_def(def)?;
    }

    let batches = match extract_all(&config.sheets, extracts_dir, &config.default_sheet_name).await {
        Ok(batches) => batches,
        Err(e) => {
            metrics.record_error("spreadsheet", "extraction");
            return Err(e);
        }
    };

    let mut total = 0;
    for (def, entries) in batches {
        metrics.record_extraction(&def.out_file, entries.len());
        total += entries.len();
        store.add_entries(entries);
    }

    store.save_entries()?;
    store.save_translations()?;
    info!(
        records = total,
        entries = store.entries().len(),
        corpus = store.ai_translation_set(0, 0).len(),
        "Extraction saved"
    );
    timer.finish();
    Ok(total)
}

/// Parse and validate the fenced payload of a completion
pub fn parse_responses(text: &str) -> Result<Vec<AiResponse>> {
    let payload = extract_fenced_payload(text)?;
    let responses: Vec<AiResponse> = serde_json::from_str(payload)?;
    InputValidator::validate_responses(&responses)?;
    Ok(responses)
}
