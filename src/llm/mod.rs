//! Streaming client for OpenAI-compatible chat completion endpoints.

use std::{pin::Pin, time::Duration};

use anyhow::{Context, Result};
use async_stream::try_stream;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;

const OPENAI_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Content(String),
    Done,
}

#[derive(Debug)]
pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let timeout = cfg.get_secs("REQUEST_TIMEOUT", 60);
        let base_url = normalize_base_url(&cfg.get("API_BASE_URL").unwrap_or_else(|| "default".into()));
        let api_key = cfg.get("OPENAI_API_KEY").filter(|k| !k.is_empty());

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("building http client")?;

        Ok(Self { http, base_url, api_key })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        opts: ChatOptions,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>> {
        let http = self.http.clone();
        let url = format!("{}/chat/completions", self.base_url);
        let api_key = self.api_key.clone();

        Box::pin(try_stream! {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
            if let Some(key) = api_key {
                headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
            }

            let body = serde_json::json!({
                "model": opts.model,
                "temperature": opts.temperature,
                "top_p": opts.top_p,
                "max_tokens": opts.max_tokens,
                "messages": messages,
                "stream": true,
            });

            debug!(%url, model = %opts.model, "sending chat request");
            let resp = http
                .post(&url)
                .headers(headers)
                .json(&body)
                .send()
                .await
                .context("failed to send chat request")?;

            if !resp.status().is_success() {
                Err(anyhow::anyhow!("LLM error: {}", resp.status()))?;
            }

            let mut buf = String::new();
            let mut bytes = resp.bytes_stream();
            while let Some(chunk) = bytes.next().await {
                buf.push_str(&String::from_utf8_lossy(&chunk.context("stream error")?));
                while let Some(pos) = buf.find('\n') {
                    let line: String = buf.drain(..=pos).collect();
                    match parse_sse_line(&line) {
                        Some(SseLine::Done) => {
                            yield StreamEvent::Done;
                            return;
                        }
                        Some(SseLine::Content(parts)) => {
                            for part in parts {
                                yield StreamEvent::Content(part);
                            }
                        }
                        None => {}
                    }
                }
            }
            yield StreamEvent::Done;
        })
    }

    /// Runs a chat request to completion and returns the concatenated content.
    pub async fn complete(&self, messages: Vec<ChatMessage>, opts: ChatOptions) -> Result<String> {
        let mut stream = self.chat_stream(messages, opts);
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::Content(part) => text.push_str(&part),
                StreamEvent::Done => break,
            }
        }
        Ok(text)
    }
}

fn normalize_base_url(configured: &str) -> String {
    if configured == "default" || configured.is_empty() {
        return OPENAI_BASE.to_string();
    }
    let trimmed = configured.trim_end_matches('/');
    if trimmed.ends_with("/v1") || trimmed.contains("/v1/") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v1")
    }
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Content(Vec<String>),
    Done,
}

/// Decodes one server-sent event line. Comments, blanks and malformed payloads yield `None`.
fn parse_sse_line(line: &str) -> Option<SseLine> {
    let payload = line.trim().strip_prefix("data:")?.trim();
    if payload == "[DONE]" {
        return Some(SseLine::Done);
    }
    let chunk: Chunk = serde_json::from_str(payload).ok()?;
    let parts: Vec<String> = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .filter(|c| !c.is_empty())
        .collect();
    (!parts.is_empty()).then_some(SseLine::Content(parts))
}

#[derive(Debug, Deserialize)]
struct Chunk {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Option<Delta>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}
