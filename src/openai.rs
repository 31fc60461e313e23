//! OpenAI Assistants threads as a scoring session.
//!
//! A session is an assistants thread. Runs are requested with `stream: true`
//! and each server-sent event is decoded into a `SessionEvent`.

use crate::config::AiConfig;
use crate::error::{Result, ReviewError};
use crate::session::{EventStream, ScoringSession, SessionEvent, SessionId, Usage};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::stream::BoxStream;
use futures_util::{future, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tracing::{debug, error};

/// Scoring session backed by the Assistants API
pub struct AssistantClient {
    client: Client,
    config: AiConfig,
    api_key: String,
}

impl AssistantClient {
    /// Create a client for the configured assistant
    pub fn new(config: AiConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| ReviewError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send(request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = %body, "Scoring service rejected the request");
        let reason = match status.as_u16() {
            401 => "API key is invalid or expired",
            403 => "API access denied",
            429 => "Rate limited",
            500..=599 => "Scoring service unavailable",
            _ => "Request failed",
        };
        Err(ReviewError::Transport(format!("{reason} (HTTP {status})")))
    }
}

#[async_trait]
impl ScoringSession for AssistantClient {
    async fn create_session(&self) -> Result<SessionId> {
        let response = Self::send(self.post("threads").json(&json!({}))).await?;
        let thread: Value = response.json().await?;
        let id = thread["id"]
            .as_str()
            .ok_or_else(|| ReviewError::Transport("Thread response carried no id".to_string()))?;
        Ok(SessionId(id.to_string()))
    }

    async fn post_message(&self, session: &SessionId, text: &str) -> Result<()> {
        let body = json!({ "role": "user", "content": text });
        Self::send(self.post(&format!("threads/{session}/messages")).json(&body)).await?;
        debug!(session_id = %session, bytes = text.len(), "Message posted");
        Ok(())
    }

    async fn run(&self, session: &SessionId) -> Result<EventStream> {
        let body = json!({
            "assistant_id": self.config.assistant_id,
            "instructions": self.config.instructions,
            "model": self.config.model,
            "temperature": self.config.temperature,
            "stream": true,
        });
        let response = Self::send(self.post(&format!("threads/{session}/runs")).json(&body)).await?;
        Ok(sse_events(response.bytes_stream().map(|chunk| chunk.map(|b| b.to_vec())).boxed()))
    }
}

/// Decode a streamed run body, stopping at the `[DONE]` sentinel
fn sse_events(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> EventStream {
    body.eventsource()
        .take_while(|item| {
            let finished = matches!(item, Ok(event) if event.data == "[DONE]" || event.event == "done");
            future::ready(!finished)
        })
        .filter_map(|item| async move {
            match item {
                Ok(event) => decode_event(&event.event, &event.data).transpose(),
                Err(e) => Some(Err(ReviewError::Transport(format!("Failed reading run stream: {e}")))),
            }
        })
        .boxed()
}

fn text_values(content: &Value, pointer: &str) -> String {
    content
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.pointer(pointer).and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Translate one assistants stream event
pub fn decode_event(event: &str, data: &str) -> Result<Option<SessionEvent>> {
    let raw: Value = serde_json::from_str(data)?;

    let decoded = match event {
        "thread.message.delta" => {
            let text = text_values(&raw["delta"]["content"], "/text/value");
            if text.is_empty() {
                return Ok(None);
            }
            SessionEvent::TextDelta(text)
        }
        "thread.message.completed" => SessionEvent::MessageCompleted {
            text: text_values(&raw["content"], "/text/value"),
            raw,
        },
        "thread.run.completed"
        | "thread.run.failed"
        | "thread.run.cancelled"
        | "thread.run.expired"
        | "thread.run.incomplete"
        | "thread.run.requires_action" => {
            let status = raw["status"]
                .as_str()
                .map_or_else(|| event.trim_start_matches("thread.run.").to_string(), str::to_string);
            let usage = serde_json::from_value::<Usage>(raw["usage"].clone()).ok();
            SessionEvent::RunCompleted { status, usage, raw }
        }
        "error" => {
            let message = raw["message"].as_str().unwrap_or("unknown error");
            return Err(ReviewError::Transport(format!("Run stream error: {message}")));
        }
        other => SessionEvent::Other {
            event: other.to_string(),
            raw,
        },
    };
    Ok(Some(decoded))
}
