//! Azure AI Foundry model inference (OpenAI-shaped chat completions).

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::context::AnalysisRequest;
use crate::error::LlmError;
use crate::plan::CommitPlan;

use super::openai::{ChatRequest, first_choice_text};
use super::{Provider, REQUEST_TIMEOUT, http, json};

const API_VERSION: &str = "2024-05-01-preview";

pub struct AzureFoundryProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    timeout: Duration,
}

impl AzureFoundryProvider {
    /// `endpoint` is the deployment's inference URL, e.g.
    /// `https://<resource>.services.ai.azure.com/models`.
    pub fn new(api_key: String, endpoint: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Provider for AzureFoundryProvider {
    fn name(&self) -> &str {
        "azure-foundry"
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
            provider = self.name(),
            model = %self.model,
            prompt_chars = body.prompt_chars(),
            "Sending analysis request"
        );

        let builder = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .query(&[("api-version", API_VERSION)])
            .header("api-key", &self.api_key)
            .json(&body);

        let raw = http::send(self.name(), builder, self.timeout, cancel).await?;
        let text = first_choice_text(self.name(), &raw)?;
        json::parse_plan(self.name(), &text)
    }
}
