//! Data models for translation entries and scoring results
//!
//! This module contains the records that flow between extraction, the
//! stores and the scoring service, together with the candidacy predicates
//! that decide which entries are worth scoring.

use serde::{Deserialize, Serialize};

/// Message recorded on a result whose text disagrees with its entry
pub const MERGE_ERROR_MESSAGE: &str = "Data fields do not match between ai and entries.json";

/// Descriptive fields shared by entries and results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryFields {
    /// Source file the string lives in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Path within the source file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Property holding the string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_name: Option<String>,
    /// UI component using the string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// English source text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    /// French target text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
}

impl EntryFields {
    /// Natural key: `fileName-propertyName`
    #[must_use]
    pub fn natural_key(&self) -> String {
        format!(
            "{}-{}",
            self.file_name.as_deref().unwrap_or_default(),
            self.property_name.as_deref().unwrap_or_default()
        )
    }

    /// Lay `other` over `self`: fields present on `other` win, the rest are
    /// kept from `self`.
    #[must_use]
    pub fn overlay(&self, other: &Self) -> Self {
        fn pick(top: &Option<String>, base: &Option<String>) -> Option<String> {
            top.clone().or_else(|| base.clone())
        }

        Self {
            file_name: pick(&other.file_name, &self.file_name),
            path: pick(&other.path, &self.path),
            property_name: pick(&other.property_name, &self.property_name),
            component: pick(&other.component, &self.component),
            en: pick(&other.en, &self.en),
            fr: pick(&other.fr, &self.fr),
        }
    }

    /// Both `en` and `fr` as non-empty strings, if present
    #[must_use]
    pub fn text_pair(&self) -> Option<(&str, &str)> {
        match (self.en.as_deref(), self.fr.as_deref()) {
            (Some(en), Some(fr)) if !en.is_empty() && !fr.is_empty() => Some((en, fr)),
            _ => None,
        }
    }
}

/// True when both `en` and `fr` are non-empty strings
#[must_use]
pub fn is_good_base(fields: &EntryFields) -> bool {
    fields.text_pair().is_some()
}

/// True when an entry is eligible for scoring and for the translation corpus
#[must_use]
pub fn is_translation_candidate(fields: &EntryFields) -> bool {
    let Some((en, fr)) = fields.text_pair() else {
        return false;
    };
    let en = en.to_lowercase();
    let fr = fr.to_lowercase();

    !(fr == "undefined"
        || fr == "data?"
        || fr.ends_with("_fr")
        || (en.chars().count() <= 3 && en == fr))
}

/// A single translatable UI string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Natural key
    pub key: String,
    /// Descriptive fields
    #[serde(flatten)]
    pub fields: EntryFields,
    /// Derived candidacy flag, recomputed on every read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_for_ai: Option<bool>,
}

impl Entry {
    /// Build an entry from extracted fields, deriving its natural key
    #[must_use]
    pub fn from_fields(fields: EntryFields) -> Self {
        Self {
            key: fields.natural_key(),
            fields,
            include_for_ai: None,
        }
    }

    /// Whether this entry may be sent for scoring
    #[must_use]
    pub fn include_for_ai(&self) -> bool {
        is_translation_candidate(&self.fields)
    }
}

/// Text disagreement recorded when a result is merged onto its entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeDrift {
    /// French text held by the entry
    pub entry_fr: Option<String>,
    /// French text echoed by the scoring service
    pub ai_fr: Option<String>,
    /// English text held by the entry
    pub entry_en: Option<String>,
    /// English text echoed by the scoring service
    pub ai_en: Option<String>,
    /// Human readable description of the mismatch
    pub merge_error: String,
}

/// Scores shared by results and raw responses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    /// Translation quality, 0 (wrong) to 5 (best possible)
    pub ai_translation_score: u8,
    /// Consistency with the rest of the corpus, 0 to 5
    pub ai_consistency_score: u8,
    /// Explanation of problems found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_comments: Option<String>,
    /// Suggested alternative translation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_suggestion: Option<String>,
}

impl Scores {
    /// True when either score is below the maximum
    #[must_use]
    pub const fn needs_review(&self) -> bool {
        self.ai_translation_score != 5 || self.ai_consistency_score != 5
    }
}

/// Scored outcome for one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResult {
    /// Natural key of the originating entry
    pub key: String,
    /// Descriptive fields, merged from the entry at merge time
    #[serde(flatten)]
    pub fields: EntryFields,
    /// Scores returned by the service
    #[serde(flatten)]
    pub scores: Scores,
    /// Set once the result has been merged into the store
    #[serde(default)]
    pub ai_result_available: bool,
    /// Present only when entry and result text disagree
    #[serde(flatten)]
    pub drift: Option<MergeDrift>,
}

/// One record of the scoring service's response payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiResponse {
    /// Numeric key assigned when the batch was built
    pub key: u64,
    /// English text echoed back
    #[serde(default)]
    pub en: Option<String>,
    /// French text echoed back
    #[serde(default)]
    pub fr: Option<String>,
    /// Scores and commentary
    #[serde(flatten)]
    pub scores: Scores,
}

impl AiResponse {
    /// Convert into a result under the resolved natural key
    #[must_use]
    pub fn into_result(self, key: String) -> AiResult {
        AiResult {
            key,
            fields: EntryFields {
                en: self.en,
                fr: self.fr,
                ..EntryFields::default()
            },
            scores: self.scores,
            ai_result_available: false,
            drift: None,
        }
    }
}

/// One record of a scoring request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiTranslation {
    /// Compact numeric key
    pub key: u64,
    /// English text
    pub en: String,
    /// French text
    pub fr: String,
}

/// English/French pair of the translation corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationPair {
    /// English text
    pub en: String,
    /// French text
    pub fr: String,
}

/// Output format for review reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Comma-separated values format
    Csv,
    /// Plain text format
    Txt,
    /// JSON format
    #[default]
    Json,
}

impl OutputFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Txt => "txt",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "txt" => Ok(Self::Txt),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
