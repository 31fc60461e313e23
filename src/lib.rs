//! Translation Review - bilingual UI string extraction and scoring
//!
//! A Rust library for extracting English/French UI strings from spreadsheet
//! exports, sending them in batches to a language model for quality and
//! consistency scoring, and merging the scores back onto the extracted
//! entries.
//!
//! # Features
//!
//! - Extract entries from xlsx exports with per-workbook column layouts
//! - Stable natural keys with last-write-wins re-extraction
//! - Compact numeric keys for requests, persisted across restarts
//! - Incremental scoring that never resubmits a scored entry
//! - Drift detection when the model echoes back altered text
//! - Review reports in TXT, CSV and JSON

/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// Spreadsheet extraction
pub mod extract;
/// Review report writing
pub mod file_writer;
/// Natural key to numeric key mapping
pub mod identity;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Assistants API client
pub mod openai;
/// Scoring request text
pub mod prompt;
/// Scoring pass orchestration
pub mod service;
/// Scoring session contract and run recording
pub mod session;
/// Entry and result stores
pub mod store;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use error::{Result, ReviewError};
pub use identity::KeyMap;
pub use models::{AiResponse, AiResult, AiTranslation, Entry, EntryFields, OutputFormat, TranslationPair};
pub use service::ReviewService;
pub use session::ScoringSession;
pub use store::{MergeReport, ResultStore, StorePaths};
