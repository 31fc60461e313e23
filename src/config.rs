use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::extract::{default_sheets, SheetDef};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    /// Scoring service settings
    pub ai: AiConfig,
    /// Workbook layouts
    pub extract: ExtractConfig,
}

/// Directories for stores, session files and exports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Holds entries.json, results.json, translations.json and keymap.json
    pub working_dir: String,
    /// Session side files
    pub out_dir: String,
    /// Spreadsheet exports
    pub extracts_dir: String,
}

/// Log level, output file and format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Rolling JSON log file, stderr only when unset
    pub file_path: Option<String>,
    pub format: String, // "json" or "text"
}

/// Scoring service connection and batching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Base URL of the Assistants API
    pub api_base_url: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub assistant_id: String,
    pub model: String,
    pub temperature: f64,
    /// Run instructions sent with every run
    pub instructions: String,
    /// Entries per batch when no count is given
    pub batch_size: usize,
    /// Upper bound accepted for a batch count
    pub max_batch_size: usize,
    /// USD per 1000 prompt tokens
    pub input_cost_per_1k: f64,
    /// USD per 1000 completion tokens
    pub output_cost_per_1k: f64,
    /// Echo streamed text to stdout while a run is in progress
    pub echo_stream: bool,
}

/// Spreadsheet export layouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Worksheet read when a layout names none
    pub default_sheet_name: String,
    pub sheets: Vec<SheetDef>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                working_dir: "./working".to_string(),
                out_dir: "./out".to_string(),
                extracts_dir: "./extracts".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            ai: AiConfig {
                api_base_url: "https://api.openai.com/v1".to_string(),
                api_key_env: "OPENAI_KEY".to_string(),
                assistant_id: "asst_vNgUoo6FjjNIs0WwuS3BReBL".to_string(),
                model: "gpt-4o".to_string(),
                temperature: 0.1,
                instructions: "You are a helpful assistant that uses the provided files to answer questions \
                               about the quality and consistency of translation between English and French."
                    .to_string(),
                batch_size: 20,
                max_batch_size: 500,
                input_cost_per_1k: 0.005,
                output_cost_per_1k: 0.015,
                echo_stream: true,
            },
            extract: ExtractConfig {
                default_sheet_name: "TO BE PROCESSED".to_string(),
                sheets: default_sheets(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to build default configuration: {}", e))?;

        let config = Config::builder()
            // Start with default values
            .add_source(defaults)
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("config").required(false))
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("TRANSLATION_REVIEW").separator("__"))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate storage config
        if self.storage.working_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("working_dir must not be empty"));
        }
        if self.storage.out_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("out_dir must not be empty"));
        }

        // Validate AI config
        if self.ai.batch_size == 0 {
            return Err(anyhow::anyhow!("batch_size must be greater than 0"));
        }
        if self.ai.batch_size > self.ai.max_batch_size {
            return Err(anyhow::anyhow!(
                "batch_size {} exceeds max_batch_size {}",
                self.ai.batch_size,
                self.ai.max_batch_size
            ));
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(anyhow::anyhow!("temperature must be between 0 and 2"));
        }
        if self.ai.input_cost_per_1k < 0.0 || self.ai.output_cost_per_1k < 0.0 {
            return Err(anyhow::anyhow!("token costs must not be negative"));
        }
        if self.ai.api_key_env.trim().is_empty() {
            return Err(anyhow::anyhow!("api_key_env must name an environment variable"));
        }

        // Validate sheet definitions
        for sheet in &self.extract.sheets {
            crate::validation::InputValidator::validate_sheet_def(sheet)?;
        }

        Ok(())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Get the scoring service API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.ai.api_key_env)
            .map_err(|_| anyhow::anyhow!("Environment variable {} is not set", self.ai.api_key_env))
    }

    /// Directory holding the JSON stores
    pub fn working_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.working_dir)
    }

    /// Directory for session side files
    pub fn out_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.out_dir)
    }

    /// Directory of spreadsheet exports
    pub fn extracts_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.extracts_dir)
    }
}
