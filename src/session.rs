//! Scoring session contract and streamed-run recording.
//!
//! A scoring service is driven through three calls: open a session, post the
//! request text, then run it and consume a stream of events. Every event other
//! than a text delta is appended to `<session>_log.json` as it arrives and the
//! deltas are appended to `<session>_running.txt`, so an interrupted run can be
//! inspected afterwards.

use crate::error::{Result, ReviewError};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Identifier of one scoring interaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token usage reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens sent
    #[serde(default)]
    pub prompt_tokens: u64,
    /// Tokens generated
    #[serde(default)]
    pub completion_tokens: u64,
    /// Sum of both
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Estimated cost given per-1000-token prices
    #[must_use]
    pub fn cost(&self, input_per_1k: f64, output_per_1k: f64) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let (prompt, completion) = (self.prompt_tokens as f64, self.completion_tokens as f64);
        input_per_1k / 1000.0 * prompt + output_per_1k / 1000.0 * completion
    }
}

/// Event of a streamed run
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Incremental completion text
    TextDelta(String),
    /// A complete assistant message
    MessageCompleted {
        /// Message text
        text: String,
        /// Event as received
        raw: Value,
    },
    /// Terminal event of the run
    RunCompleted {
        /// Final status, `completed` on success
        status: String,
        /// Token usage, when reported
        usage: Option<Usage>,
        /// Run object as received
        raw: Value,
    },
    /// Any other lifecycle event
    Other {
        /// Event name
        event: String,
        /// Event payload
        raw: Value,
    },
}

impl SessionEvent {
    /// The record written to the event log; deltas are not logged
    #[must_use]
    pub fn log_record(&self) -> Option<Value> {
        let (event, data) = match self {
            Self::TextDelta(_) => return None,
            Self::MessageCompleted { raw, .. } => ("thread.message.completed", raw),
            Self::RunCompleted { status, raw, .. } => {
                return Some(serde_json::json!({ "event": format!("thread.run.{status}"), "data": raw }));
            }
            Self::Other { event, raw } => (event.as_str(), raw),
        };
        Some(serde_json::json!({ "event": event, "data": data }))
    }
}

/// Stream of run events
pub type EventStream = BoxStream<'static, Result<SessionEvent>>;

/// The contract a scoring service has to fulfil
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoringSession: Send + Sync {
    /// Open a new session
    async fn create_session(&self) -> Result<SessionId>;

    /// Add a user message to the session
    async fn post_message(&self, session: &SessionId, text: &str) -> Result<()>;

    /// Start a run over the session's messages and stream its events
    async fn run(&self, session: &SessionId) -> Result<EventStream>;
}

/// Outcome of a fully consumed run
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Text of the last completed message
    pub text: String,
    /// Terminal status
    pub status: String,
    /// Token usage, when reported
    pub usage: Option<Usage>,
}

impl Completion {
    /// True when the run finished normally
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// Side files of one session, all named after the session id
#[derive(Debug, Clone)]
pub struct SessionFiles {
    base: PathBuf,
}

impl SessionFiles {
    /// Files for `session` inside `out_dir`
    #[must_use]
    pub fn new(out_dir: &Path, session: &SessionId) -> Self {
        Self {
            base: out_dir.join(&session.0),
        }
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut name = self.base.clone().into_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Request text
    #[must_use]
    pub fn input(&self) -> PathBuf {
        self.with_suffix("_input.txt")
    }

    /// Structured event log
    #[must_use]
    pub fn log(&self) -> PathBuf {
        self.with_suffix("_log.json")
    }

    /// Running transcript of deltas
    #[must_use]
    pub fn running(&self) -> PathBuf {
        self.with_suffix("_running.txt")
    }

    /// Raw completion text
    #[must_use]
    pub fn response(&self) -> PathBuf {
        self.with_suffix("_response.txt")
    }

    /// Parsed response payload
    #[must_use]
    pub fn parsed(&self) -> PathBuf {
        self.with_suffix("_parsed.json")
    }
}

/// Appends run events to the session's log and transcript files
pub struct SessionRecorder {
    files: SessionFiles,
    logged: usize,
    echo: bool,
}

impl SessionRecorder {
    /// Start the event log for a session
    pub async fn start(files: SessionFiles, echo: bool) -> Result<Self> {
        if let Some(parent) = files.log().parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(files.log(), "{\n  \"events\": [\n").await?;
        Ok(Self {
            files,
            logged: 0,
            echo,
        })
    }

    async fn append(path: &Path, text: &str) -> Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path).await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Persist one event
    pub async fn record(&mut self, event: &SessionEvent) -> Result<()> {
        if let SessionEvent::TextDelta(text) = event {
            Self::append(&self.files.running(), text).await?;
            if self.echo {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(text.as_bytes()).await?;
                stdout.flush().await?;
            }
            return Ok(());
        }

        if let Some(record) = event.log_record() {
            let separator = if self.logged == 0 { "" } else { "," };
            let line = format!("{separator}{}\n", serde_json::to_string(&record)?);
            Self::append(&self.files.log(), &line).await?;
            self.logged += 1;
        }
        Ok(())
    }

    /// Close the event log with the final run object
    pub async fn finish(self, run: &Value) -> Result<()> {
        let footer = format!("\n  ], \"run\": {} \n}}", serde_json::to_string(run)?);
        Self::append(&self.files.log(), &footer).await?;
        if self.echo {
            tokio::io::stdout().write_all(b"\n").await?;
        }
        debug!(events = self.logged, "Session log closed");
        Ok(())
    }
}

/// Consume a run's events, recording each one, until the run completes
pub async fn drive(mut events: EventStream, mut recorder: SessionRecorder) -> Result<Completion> {
    let mut text = String::new();

    while let Some(event) = events.next().await {
        let event = event?;
        recorder.record(&event).await?;

        match event {
            SessionEvent::MessageCompleted { text: message, .. } => text = message,
            SessionEvent::RunCompleted { status, usage, raw } => {
                recorder.finish(&raw).await?;
                info!(status = %status, "Run finished");
                return Ok(Completion { text, status, usage });
            }
            SessionEvent::TextDelta(_) | SessionEvent::Other { .. } => {}
        }
    }

    Err(ReviewError::Transport(
        "Event stream ended before the run completed".to_string(),
    ))
}

/// The payload between the first pair of triple-backtick fences, with its
/// four-character language tag removed.
pub fn extract_fenced_payload(text: &str) -> Result<&str> {
    let mut parts = text.split("```");
    parts.next();
    let inner = parts.next().ok_or(ReviewError::MissingFence)?;
    // the closing fence has to exist as well
    parts.next().ok_or(ReviewError::MissingFence)?;

    Ok(inner.char_indices().nth(4).map_or("", |(offset, _)| &inner[offset..]))
}
