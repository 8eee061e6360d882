//! LLM providers: one uniform `analyze` contract over several HTTP back-ends.

pub mod anthropic;
pub mod azure;
pub mod gemini;
pub mod http;
pub mod json;
pub mod openai;
pub mod prompt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::{ProviderKind, UserConfig};
use crate::context::AnalysisRequest;
use crate::error::{ConfigError, LlmError};
use crate::plan::CommitPlan;

pub use anthropic::AnthropicProvider;
pub use azure::AzureFoundryProvider;
pub use gemini::GeminiProvider;
pub use http::REQUEST_TIMEOUT;
pub use json::{extract_json, parse_plan};
pub use openai::OpenAiProvider;
pub use prompt::{system_prompt, user_prompt};

/// A back-end that turns an analysis request into a commit plan.
///
/// Each call is exactly one HTTPS round-trip; nothing is retried.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identifier as used in config (`anthropic`, `grok`, ...).
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Ask the model for a plan. Returns [`LlmError::Cancelled`] once `cancel` fires.
    async fn analyze(
        &self,
        cancel: &CancellationToken,
        request: &AnalysisRequest,
    ) -> Result<CommitPlan, LlmError>;
}

/// Build the adapter selected by `config.provider`.
pub fn new_provider(config: &UserConfig) -> Result<Box<dyn Provider>, ConfigError> {
    let credential = |key: &str| {
        config
            .credential(key)
            .map(str::to_string)
            .ok_or_else(|| ConfigError::MissingApiKey {
                provider: config.provider.to_string(),
                key: key.to_string(),
            })
    };
    let model = config.model();

    let provider: Box<dyn Provider> = match config.provider {
        ProviderKind::Anthropic => Box::new(AnthropicProvider::new(
            credential("ANTHROPIC_API_KEY")?,
            model,
        )),
        ProviderKind::OpenAi => Box::new(OpenAiProvider::new(credential("OPENAI_API_KEY")?, model)),
        ProviderKind::Grok => Box::new(OpenAiProvider::grok(credential("XAI_API_KEY")?, model)),
        ProviderKind::Gemini => Box::new(GeminiProvider::new(credential("GEMINI_API_KEY")?, model)),
        ProviderKind::AzureFoundry => Box::new(AzureFoundryProvider::new(
            credential("AZURE_FOUNDRY_API_KEY")?,
            credential("AZURE_FOUNDRY_ENDPOINT")?,
            model,
        )),
    };

    Ok(provider)
}
