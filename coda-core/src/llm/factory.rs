//! Provider construction: maps a resolved model to a boxed [`Generator`]
//! with its API key pulled from the environment.
//!
//! [`Generator`]: crate::llm::provider::Generator

use crate::config::constants::env;
use crate::config::models::{ProviderKind, ResolvedModel};
use crate::llm::provider::{Generator, LLMError, ToolSpec};
use crate::llm::providers::{
    AnthropicProvider, DeepSeekProvider, GeminiProvider, OpenAiCompatProvider, OpenAiProvider,
};

fn require_key(var: &str, provider: &str) -> Result<String, LLMError> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(LLMError::Authentication(format!(
            "{provider}: {var} is not set"
        ))),
    }
}

/// Builds the vendor adapter for a resolved model.
///
/// `custom_url` overrides the provider's default endpoint. Models not in the
/// alias table route to the OpenAI-compatible adapter and require one; a
/// missing API key for that adapter is tolerated (local servers often need
/// none).
pub fn build_provider(
    resolved: &ResolvedModel,
    custom_url: Option<String>,
    system_prompt: String,
    tool_specs: &[ToolSpec],
) -> Result<Box<dyn Generator>, LLMError> {
    match resolved.provider {
        ProviderKind::Anthropic => {
            let key = require_key(env::ANTHROPIC_API_KEY, "anthropic")?;
            let provider = AnthropicProvider::new(key, system_prompt, tool_specs);
            Ok(Box::new(match custom_url {
                Some(url) => provider.with_base_url(url),
                None => provider,
            }))
        }
        ProviderKind::OpenAi => {
            let key = require_key(env::OPENAI_API_KEY, "openai")?;
            Ok(Box::new(match custom_url {
                Some(url) => OpenAiProvider::with_base_url(key, url, system_prompt, tool_specs),
                None => OpenAiProvider::new(key, system_prompt, tool_specs),
            }))
        }
        ProviderKind::Gemini => {
            let key = require_key(env::GEMINI_API_KEY, "gemini")?;
            Ok(Box::new(match custom_url {
                Some(url) => GeminiProvider::with_base_url(key, url, system_prompt, tool_specs),
                None => GeminiProvider::new(key, system_prompt, tool_specs),
            }))
        }
        ProviderKind::DeepSeek => {
            let key = require_key(env::DEEPSEEK_API_KEY, "deepseek")?;
            Ok(Box::new(match custom_url {
                Some(url) => DeepSeekProvider::with_base_url(key, url, system_prompt, tool_specs),
                None => DeepSeekProvider::new(key, system_prompt, tool_specs),
            }))
        }
        ProviderKind::OpenAiCompat => {
            let url = custom_url.ok_or_else(|| {
                LLMError::InvalidRequest(format!(
                    "unknown model {}: set a custom base URL with --custom-url or {}",
                    resolved.config.model,
                    env::CUSTOM_URL
                ))
            })?;
            let key = std::env::var(env::OPENAI_API_KEY).unwrap_or_default();
            Ok(Box::new(OpenAiCompatProvider::new(
                "openai-compat",
                url,
                key,
                system_prompt,
                tool_specs,
            )))
        }
    }
}
