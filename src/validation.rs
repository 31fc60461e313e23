use crate::error::{Result, ReviewError};
use crate::extract::{columns, SheetDef};
use crate::models::AiResponse;
use std::collections::HashSet;
use std::path::Path;

/// Highest score the scoring service may award
pub const MAX_SCORE: u8 = 5;

fn invalid(message: impl Into<String>) -> ReviewError {
    ReviewError::Validation(message.into())
}

/// Validation utilities for input sanitization and edge case handling
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate the number of entries requested for one scoring pass
    pub fn validate_batch_size(batch_size: usize, max: usize) -> Result<()> {
        if batch_size == 0 {
            return Err(invalid("Batch size must be greater than 0"));
        }

        if batch_size > max {
            return Err(invalid(format!("Batch size too large (max {max})")));
        }

        Ok(())
    }

    /// Validate a single score
    pub fn validate_score(name: &str, score: u8) -> Result<()> {
        if score > MAX_SCORE {
            return Err(invalid(format!("{name} {score} is outside 0..={MAX_SCORE}")));
        }
        Ok(())
    }

    /// Validate one response record
    pub fn validate_response(response: &AiResponse) -> Result<()> {
        Self::validate_score("aiTranslationScore", response.scores.ai_translation_score)
            .and_then(|()| Self::validate_score("aiConsistencyScore", response.scores.ai_consistency_score))
            .map_err(|e| invalid(format!("Response for key {}: {e}", response.key)))
    }

    /// Validate a whole response batch; nothing in it may be merged if any record fails
    pub fn validate_responses(responses: &[AiResponse]) -> Result<()> {
        responses.iter().try_for_each(Self::validate_response)
    }

    /// Validate a workbook layout
    pub fn validate_sheet_def(def: &SheetDef) -> Result<()> {
        if def.src_file.trim().is_empty() {
            return Err(invalid("Sheet source file cannot be empty"));
        }

        Self::validate_file_path(Path::new(&def.src_file))?;

        if def.headers.is_empty() {
            return Err(invalid(format!("Sheet {} declares no headers", def.src_file)));
        }

        for required in [columns::FILE_NAME, columns::PROPERTY_NAME] {
            if !def.headers.iter().any(|h| h == required) {
                return Err(invalid(format!("Sheet {} has no {required} column", def.src_file)));
            }
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = def.headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(invalid(format!("Sheet {} repeats column {duplicate}", def.src_file)));
        }

        if def.sheet_rows == Some(0) {
            return Err(invalid(format!("Sheet {} reads zero rows", def.src_file)));
        }

        Ok(())
    }

    /// Validate file path
    pub fn validate_file_path(path: &Path) -> Result<()> {
        if path.to_string_lossy().is_empty() {
            return Err(invalid("File path cannot be empty"));
        }

        // Check for path traversal attempts
        let path_str = path.to_string_lossy();
        if path_str.contains("..") || path_str.contains('~') {
            return Err(invalid("File path contains potentially dangerous characters"));
        }

        // Check path length
        if path_str.len() > 4096 {
            return Err(invalid("File path too long (max 4096 characters)"));
        }

        Ok(())
    }

    /// Sanitize text input
    #[must_use]
    pub fn sanitize_text(text: &str) -> String {
        text.chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\r')
            .collect::<String>()
            .trim()
            .to_string()
    }
}
