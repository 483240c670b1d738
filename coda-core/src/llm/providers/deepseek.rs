//! DeepSeek adapter. Speaks the chat-completions codec; the reasoner model
//! returns its trace in `reasoning_content`, which the shared codec surfaces
//! as a thinking block.

use async_trait::async_trait;

use crate::config::constants::{providers, urls};
use crate::llm::provider::{Dialog, GenConfig, Generator, LLMError, StepResponse, ToolSpec};
use crate::llm::retry::RetryPolicy;
use crate::llm::truncate::TruncationPolicy;

use super::openai_compat::OpenAiCompatProvider;

pub struct DeepSeekProvider {
    inner: OpenAiCompatProvider,
}

impl DeepSeekProvider {
    pub fn new(api_key: String, system_prompt: String, tool_specs: &[ToolSpec]) -> Self {
        Self::with_base_url(
            api_key,
            urls::DEEPSEEK_API_BASE.to_string(),
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
                providers::DEEPSEEK,
                base_url,
                api_key,
                system_prompt,
                tool_specs,
            ),
        }
    }

    pub fn with_policies(mut self, retry: RetryPolicy, truncation: TruncationPolicy) -> Self {
        self.inner = self.inner.with_policies(retry, truncation);
        self
    }
}

#[async_trait]
impl Generator for DeepSeekProvider {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        self.inner.generate(dialog, config).await
    }
}
