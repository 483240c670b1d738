//! OpenAI adapter: the chat-completions codec pointed at api.openai.com,
//! with reasoning-effort support for the o-series models.

use async_trait::async_trait;

use crate::config::constants::{providers, urls};
use crate::llm::provider::{Dialog, GenConfig, Generator, LLMError, StepResponse, ToolSpec};
use crate::llm::retry::RetryPolicy;
use crate::llm::truncate::TruncationPolicy;

use super::openai_compat::OpenAiCompatProvider;

pub struct OpenAiProvider {
    inner: OpenAiCompatProvider,
}

impl OpenAiProvider {
    pub fn new(api_key: String, system_prompt: String, tool_specs: &[ToolSpec]) -> Self {
        Self::with_base_url(
            api_key,
            urls::OPENAI_API_BASE.to_string(),
            system_prompt,
            tool_specs,
        )
    }

    pub fn with_base_url(
        api_key: String,
        base_url: String,
        system_prompt: String,
        tool_specs: &[ToolSpec],
    ) -> Self {
        Self {
            inner: OpenAiCompatProvider::new(
                providers::OPENAI,
                base_url,
                api_key,
                system_prompt,
                tool_specs,
            )
            .with_reasoning_effort(true),
        }
    }

    pub fn with_policies(mut self, retry: RetryPolicy, truncation: TruncationPolicy) -> Self {
        self.inner = self.inner.with_policies(retry, truncation);
        self
    }
}

#[async_trait]
impl Generator for OpenAiProvider {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        self.inner.generate(dialog, config).await
    }
}
