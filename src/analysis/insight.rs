use anyhow::{bail, Result};
use async_trait::async_trait;

use super::InsightProvider;
use crate::config::Config;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, Role};

const REVIEWER_ROLE: &str = "You are an experienced code reviewer.\nAnswer in Markdown with one short section per requested point.\nBe concrete: reference the lines or constructs you are talking about.\nIf a point does not apply, say so in one sentence.";

/// Insight provider backed by a chat completion model.
pub struct LlmInsight {
    client: LlmClient,
    options: ChatOptions,
}

impl LlmInsight {
    pub fn new(client: LlmClient, model: impl Into<String>) -> Self {
        Self {
            client,
            options: ChatOptions {
                model: model.into(),
                temperature: 0.2,
                top_p: 1.0,
                max_tokens: 1024,
            },
        }
    }

    /// `model` overrides `DEFAULT_MODEL`.
    pub fn from_config(cfg: &Config, model: Option<String>) -> Result<Self> {
        let client = LlmClient::from_config(cfg)?;
        let model = model
            .or_else(|| cfg.get("DEFAULT_MODEL"))
            .unwrap_or_else(|| "gpt-4o".to_string());
        Ok(Self::new(client, model))
    }

    pub fn model(&self) -> &str {
        &self.options.model
    }

    fn messages(prompt: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, REVIEWER_ROLE),
            ChatMessage::new(Role::User, prompt),
        ]
    }
}

#[async_trait]
impl InsightProvider for LlmInsight {
    async fn insight(&self, prompt: &str) -> Result<String> {
        if !self.client.has_api_key() {
            bail!("OPENAI_API_KEY is not set");
        }
        self.client.complete(Self::messages(prompt), self.options.clone()).await
    }
}
