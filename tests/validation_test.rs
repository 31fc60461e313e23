//! Comprehensive unit tests for validation.rs module

use std::path::Path;
use translation_review::extract::{columns, SheetDef};
use translation_review::models::{AiResponse, Scores};
use translation_review::validation::{InputValidator, MAX_SCORE};
use translation_review::ReviewError;

fn response(key: u64, translation: u8, consistency: u8) -> AiResponse {
    AiResponse {
        key,
        en: Some("Save".to_string()),
        fr: Some("Enregistrer".to_string()),
        scores: Scores {
            ai_translation_score: translation,
            ai_consistency_score: consistency,
            ai_comments: None,
            ai_suggestion: None,
        },
    }
}

fn sheet(headers: &[&str]) -> SheetDef {
    SheetDef {
        src_file: "2/Translate_Rules_Extract 2".to_string(),
        out_file: "Rules".to_string(),
        sheet_name: None,
        headers: headers.iter().map(ToString::to_string).collect(),
        disabled: false,
        sheet_rows: None,
    }
}

#[test]
fn test_validate_batch_size_valid() {
    assert!(InputValidator::validate_batch_size(20, 500).is_ok());
}

#[test]
fn test_validate_batch_size_zero() {
    assert!(InputValidator::validate_batch_size(0, 500).is_err());
}

#[test]
fn test_validate_batch_size_at_max() {
    assert!(InputValidator::validate_batch_size(500, 500).is_ok());
}

#[test]
fn test_validate_batch_size_above_max() {
    let result = InputValidator::validate_batch_size(501, 500);
    assert!(matches!(result, Err(ReviewError::Validation(_))));
}

#[test]
fn test_validate_score_bounds() {
    for score in 0..=MAX_SCORE {
        assert!(InputValidator::validate_score("aiTranslationScore", score).is_ok());
    }
    assert!(InputValidator::validate_score("aiTranslationScore", MAX_SCORE + 1).is_err());
}

#[test]
fn test_validate_response_names_key() {
    let err = InputValidator::validate_response(&response(7, 3, 6)).unwrap_err();
    assert!(err.to_string().contains("key 7"));
    assert!(err.to_string().contains("aiConsistencyScore"));
}

#[test]
fn test_validate_responses_rejects_whole_batch() {
    let batch = vec![response(0, 5, 5), response(1, 4, 4), response(2, 10, 0)];
    assert!(InputValidator::validate_responses(&batch).is_err());
}

#[test]
fn test_validate_responses_empty_batch() {
    assert!(InputValidator::validate_responses(&[]).is_ok());
}

#[test]
fn test_validate_sheet_def_valid() {
    let def = sheet(&[columns::VERSION, columns::FILE_NAME, columns::PROPERTY_NAME, columns::EXISTING_EN]);
    assert!(InputValidator::validate_sheet_def(&def).is_ok());
}

#[test]
fn test_validate_sheet_def_missing_file_name() {
    let def = sheet(&[columns::VERSION, columns::PROPERTY_NAME]);
    assert!(InputValidator::validate_sheet_def(&def).is_err());
}

#[test]
fn test_validate_sheet_def_duplicate_column() {
    let def = sheet(&[columns::FILE_NAME, columns::PROPERTY_NAME, columns::NEW_FR, columns::NEW_FR]);
    assert!(InputValidator::validate_sheet_def(&def).is_err());
}

#[test]
fn test_validate_sheet_def_empty_source() {
    let mut def = sheet(&[columns::FILE_NAME, columns::PROPERTY_NAME]);
    def.src_file = "   ".to_string();
    assert!(InputValidator::validate_sheet_def(&def).is_err());
}

#[test]
fn test_validate_sheet_def_zero_rows() {
    let mut def = sheet(&[columns::FILE_NAME, columns::PROPERTY_NAME]);
    def.sheet_rows = Some(0);
    assert!(InputValidator::validate_sheet_def(&def).is_err());

    def.sheet_rows = Some(1);
    assert!(InputValidator::validate_sheet_def(&def).is_ok());
}

#[test]
fn test_validate_file_path_valid() {
    assert!(InputValidator::validate_file_path(Path::new("reports/review.csv")).is_ok());
}

#[test]
fn test_validate_file_path_empty() {
    assert!(InputValidator::validate_file_path(Path::new("")).is_err());
}

#[test]
fn test_validate_file_path_traversal() {
    assert!(InputValidator::validate_file_path(Path::new("../../../etc/passwd")).is_err());
}

#[test]
fn test_validate_file_path_tilde() {
    assert!(InputValidator::validate_file_path(Path::new("~/reports")).is_err());
}

#[test]
fn test_validate_file_path_too_long() {
    let long_path = "a".repeat(4097);
    assert!(InputValidator::validate_file_path(Path::new(&long_path)).is_err());
}

#[test]
fn test_sanitize_text_removes_control_chars() {
    let result = InputValidator::sanitize_text("Bonjour\x00\x01 le monde");
    assert_eq!(result, "Bonjour le monde");
}

#[test]
fn test_sanitize_text_keeps_newlines_and_accents() {
    let result = InputValidator::sanitize_text("  Première ligne\nDeuxième\tligne  ");
    assert_eq!(result, "Première ligne\nDeuxième\tligne");
}
