//! Vendor adapters implementing the provider-neutral [`Generator`] contract.
//!
//! [`Generator`]: crate::llm::provider::Generator

mod anthropic;
mod deepseek;
mod gemini;
mod openai;
mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use deepseek::DeepSeekProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use openai_compat::OpenAiCompatProvider;

use reqwest::StatusCode;

use crate::llm::provider::LLMError;

/// Maps an HTTP failure to the shared error taxonomy: 429 is a rate limit,
/// 5xx is transient, auth failures and everything else are final.
pub(crate) fn classify_status(provider: &str, status: StatusCode, body: &str) -> LLMError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return LLMError::RateLimit;
    }
    if status.is_server_error() {
        return LLMError::Transient(format!("{provider}: HTTP {status}: {body}"));
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return LLMError::Authentication(format!("{provider}: HTTP {status}: {body}"));
    }
    LLMError::Provider(format!("{provider}: HTTP {status}: {body}"))
}
