//! Review report writing.
//!
//! This module renders scoring results that need a human look in the three
//! supported formats (TXT, CSV, JSON), either to a file or to any writer.

use crate::error::Result;
use crate::models::{AiResult, OutputFormat};
use crate::validation::InputValidator;
use csv::Writer;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Results that are available and scored below 5 on either axis
#[must_use]
pub fn results_needing_review(results: &[AiResult]) -> Vec<&AiResult> {
    results
        .iter()
        .filter(|result| result.ai_result_available && result.scores.needs_review())
        .collect()
}

/// Write results to a file in the specified format, creating parent directories.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn write_results_to_file(results: &[&AiResult], format: OutputFormat, file_path: &Path) -> Result<()> {
    if let Some(parent) = file_path.parent() {
        create_dir_all(parent)?;
    }
    let file = File::create(file_path)?;
    write_results(results, format, BufWriter::new(file))
}

/// Write results to `writer` in the specified format
pub fn write_results<W: Write>(results: &[&AiResult], format: OutputFormat, writer: W) -> Result<()> {
    match format {
        OutputFormat::Txt => write_txt(results, writer),
        OutputFormat::Csv => write_csv(results, writer),
        OutputFormat::Json => write_json(results, writer),
    }
}

fn opt(value: Option<&String>) -> &str {
    value.map_or("", String::as_str)
}

/// Format: one block per result, blank line between results
fn write_txt<W: Write>(results: &[&AiResult], mut writer: W) -> Result<()> {
    for result in results {
        writeln!(
            writer,
            "{} [translation {}/5, consistency {}/5]",
            result.key, result.scores.ai_translation_score, result.scores.ai_consistency_score
        )?;
        writeln!(writer, "  en: {}", opt(result.fields.en.as_ref()))?;
        writeln!(writer, "  fr: {}", opt(result.fields.fr.as_ref()))?;
        if let Some(suggestion) = &result.scores.ai_suggestion {
            writeln!(writer, "  suggestion: {}", InputValidator::sanitize_text(suggestion))?;
        }
        if let Some(comments) = &result.scores.ai_comments {
            writeln!(writer, "  comments: {}", InputValidator::sanitize_text(comments))?;
        }
        if let Some(drift) = &result.drift {
            writeln!(writer, "  merge error: {}", drift.merge_error)?;
        }
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Includes header row
fn write_csv<W: Write>(results: &[&AiResult], writer: W) -> Result<()> {
    let mut writer = Writer::from_writer(writer);

    writer
        .write_record([
            "Key",
            "FileName",
            "PropertyName",
            "En",
            "Fr",
            "TranslationScore",
            "ConsistencyScore",
            "Suggestion",
            "Comments",
            "MergeError",
        ])
        .map_err(std::io::Error::from)?;

    for result in results {
        let translation_score = result.scores.ai_translation_score.to_string();
        let consistency_score = result.scores.ai_consistency_score.to_string();
        writer
            .write_record([
                result.key.as_str(),
                opt(result.fields.file_name.as_ref()),
                opt(result.fields.property_name.as_ref()),
                opt(result.fields.en.as_ref()),
                opt(result.fields.fr.as_ref()),
                translation_score.as_str(),
                consistency_score.as_str(),
                opt(result.scores.ai_suggestion.as_ref()),
                opt(result.scores.ai_comments.as_ref()),
                result.drift.as_ref().map_or("", |d| d.merge_error.as_str()),
            ])
            .map_err(std::io::Error::from)?;
    }

    writer.flush()?;
    Ok(())
}

/// Outputs a JSON array of result objects
fn write_json<W: Write>(results: &[&AiResult], mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, results)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
