use metrics::{counter, histogram};
use std::time::Duration;

use crate::session::Usage;
use crate::store::MergeReport;

const BATCHES_SUBMITTED_TOTAL: &str = "translation_review_batches_submitted_total";
const ENTRIES_SUBMITTED_TOTAL: &str = "translation_review_entries_submitted_total";
const RESPONSES_MERGED_TOTAL: &str = "translation_review_responses_merged_total";
const RESPONSES_UNRESOLVED_TOTAL: &str = "translation_review_responses_unresolved_total";
const MERGE_DRIFT_TOTAL: &str = "translation_review_merge_drift_total";
const TOKENS_TOTAL: &str = "translation_review_tokens_total";
const RUN_DURATION: &str = "translation_review_run_duration_seconds";
const ENTRIES_EXTRACTED_TOTAL: &str = "translation_review_entries_extracted_total";
const ERRORS_TOTAL: &str = "translation_review_errors_total";

/// Metrics collection and management.
///
/// Every record call is forwarded to the `metrics` facade and also tallied
/// locally so a run can report its own totals.
#[derive(Debug, Default, Clone)]
pub struct MetricsCollector {
    /// Batches sent for scoring
    pub batches_submitted_total: u64,
    /// Entries sent across all batches
    pub entries_submitted_total: u64,
    /// Responses merged into the result store
    pub responses_merged_total: u64,
    /// Responses whose numeric key had no mapping
    pub responses_unresolved_total: u64,
    /// Merges where the scored text differed from the entry
    pub merge_drift_total: u64,
    /// Prompt tokens reported by finished runs
    pub prompt_tokens_total: u64,
    /// Completion tokens reported by finished runs
    pub completion_tokens_total: u64,
    /// Entries read from workbooks
    pub entries_extracted_total: u64,
    /// Recorded errors
    pub errors_total: u64,
}

impl MetricsCollector {
    /// Record a batch sent for scoring
    pub fn record_batch_submitted(&mut self, entries: usize) {
        self.batches_submitted_total += 1;
        self.entries_submitted_total += entries as u64;

        counter!(BATCHES_SUBMITTED_TOTAL).increment(1);
        counter!(ENTRIES_SUBMITTED_TOTAL).increment(entries as u64);
    }

    /// Record the outcome of merging a response batch
    pub fn record_merge(&mut self, report: &MergeReport) {
        let merged = report.merged as u64;
        let unresolved = report.unresolved.len() as u64;
        let drifted = report.drifted as u64;

        self.responses_merged_total += merged;
        self.responses_unresolved_total += unresolved;
        self.merge_drift_total += drifted;

        counter!(RESPONSES_MERGED_TOTAL).increment(merged);
        counter!(RESPONSES_UNRESOLVED_TOTAL).increment(unresolved);
        counter!(MERGE_DRIFT_TOTAL).increment(drifted);
    }

    /// Record token usage and duration of a finished run
    pub fn record_run(&mut self, status: &str, usage: Option<Usage>, duration: Duration) {
        let usage = usage.unwrap_or_default();
        self.prompt_tokens_total += usage.prompt_tokens;
        self.completion_tokens_total += usage.completion_tokens;

        counter!(TOKENS_TOTAL, "kind" => "prompt").increment(usage.prompt_tokens);
        counter!(TOKENS_TOTAL, "kind" => "completion").increment(usage.completion_tokens);
        histogram!(RUN_DURATION, "status" => status.to_string()).record(duration.as_secs_f64());
    }

    /// Record entries extracted from one workbook
    pub fn record_extraction(&mut self, sheet: &str, entries: usize) {
        self.entries_extracted_total += entries as u64;
        counter!(ENTRIES_EXTRACTED_TOTAL, "sheet" => sheet.to_string()).increment(entries as u64);
    }

    /// Record error metrics
    pub fn record_error(&mut self, error_type: &str, operation: &str) {
        self.errors_total += 1;
        counter!(ERRORS_TOTAL, "type" => error_type.to_string(), "operation" => operation.to_string()).increment(1);
    }

    /// Human readable totals
    #[must_use]
    pub fn get_summary(&self) -> String {
        format!(
            "Metrics Summary:\n\
             - Batches submitted: {}\n\
             - Entries submitted: {}\n\
             - Responses merged: {}\n\
             - Responses unresolved: {}\n\
             - Merges with drift: {}\n\
             - Prompt tokens: {}\n\
             - Completion tokens: {}\n\
             - Entries extracted: {}\n\
             - Errors: {}",
            self.batches_submitted_total,
            self.entries_submitted_total,
            self.responses_merged_total,
            self.responses_unresolved_total,
            self.merge_drift_total,
            self.prompt_tokens_total,
            self.completion_tokens_total,
            self.entries_extracted_total,
            self.errors_total,
        )
    }
}
