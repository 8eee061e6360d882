//! OpenAI-compatible chat completions. Also serves xAI's Grok, which speaks
//! the same protocol, and provides the wire types Azure Foundry reuses.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::context::AnalysisRequest;
use crate::error::LlmError;
use crate::plan::CommitPlan;

use super::{Provider, REQUEST_TIMEOUT, http, json, prompt};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const XAI_BASE_URL: &str = "https://api.x.ai/v1";

#[derive(Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Serialize, Deserialize)]
pub(crate) struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub(crate) struct Choice {
    pub message: ChatMessage,
}

impl<'a> ChatRequest<'a> {
    pub(crate) fn new(model: &'a str, request: &AnalysisRequest) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(prompt::system_prompt(request)),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(prompt::user_prompt(request)),
                },
            ],
            temperature: 0.2,
        }
    }

    pub(crate) fn prompt_chars(&self) -> usize {
        self.messages
            .iter()
            .filter_map(|m| m.content.as_ref())
            .map(String::len)
            .sum()
    }
}

/// Text of the first choice, or a parse error when there is none.
pub(crate) fn first_choice_text(provider: &str, raw: &str) -> Result<String, LlmError> {
    let response: ChatResponse = http::decode(provider, raw)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LlmError::ResponseParse {
            provider: provider.to_string(),
            error: "response has no choices".to_string(),
            raw_prefix: json::raw_prefix(raw),
        })
}

pub struct OpenAiProvider {
    client: reqwest::Client,
    name: &'static str,
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_identity("openai", OPENAI_BASE_URL, api_key, model)
    }

    /// xAI's Grok over its OpenAI-compatible endpoint.
    pub fn grok(api_key: String, model: String) -> Self {
        Self::with_identity("grok", XAI_BASE_URL, api_key, model)
    }

    fn with_identity(name: &'static str, base_url: &str, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            name,
            api_key,
            model,
            base_url: base_url.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(
        &self,
        cancel: &CancellationToken,
        request: &AnalysisRequest,
    ) -> Result<CommitPlan, LlmError> {
        let body = ChatRequest::new(&self.model, request);
        debug!(
            provider = self.name,
            model = %self.model,
            prompt_chars = body.prompt_chars(),
            "Sending analysis request"
        );

        let builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body);

        let raw = http::send(self.name, builder, self.timeout, cancel).await?;
        let text = first_choice_text(self.name, &raw)?;
        json::parse_plan(self.name, &text)
    }
}
