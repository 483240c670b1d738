//! Model alias table.
//!
//! Maps user-facing aliases to a provider family, a canonical model id, and
//! per-model generation defaults. Flags override defaults; unknown models
//! fall back to the generic OpenAI-compatible provider and require a custom
//! base URL.

use crate::config::constants::defaults;
use crate::llm::provider::{GenConfig, ThinkingBudget};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
    Gemini,
    DeepSeek,
    OpenAiCompat,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        use crate::config::constants::providers;
        match self {
            ProviderKind::Anthropic => providers::ANTHROPIC,
            ProviderKind::OpenAi => providers::OPENAI,
            ProviderKind::Gemini => providers::GEMINI,
            ProviderKind::DeepSeek => providers::DEEPSEEK,
            ProviderKind::OpenAiCompat => providers::OPENAI_COMPAT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelEntry {
    pub alias: &'static str,
    pub model_id: &'static str,
    pub provider: ProviderKind,
    pub max_tokens: u32,
    pub temperature: f32,
    pub thinking_budget: ThinkingBudget,
}

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet";

const MODEL_TABLE: &[ModelEntry] = &[
    ModelEntry {
        alias: "claude-3-5-sonnet",
        model_id: "claude-3-5-sonnet-latest",
        provider: ProviderKind::Anthropic,
        max_tokens: 8192,
        temperature: 0.3,
        thinking_budget: ThinkingBudget::None,
    },
    ModelEntry {
        alias: "claude-3-5-haiku",
        model_id: "claude-3-5-haiku-latest",
        provider: ProviderKind::Anthropic,
        max_tokens: 8192,
        temperature: 0.3,
        thinking_budget: ThinkingBudget::None,
    },
    ModelEntry {
        alias: "claude-3-7-sonnet",
        model_id: "claude-3-7-sonnet-latest",
        provider: ProviderKind::Anthropic,
        max_tokens: 64_000,
        temperature: 1.0,
        thinking_budget: ThinkingBudget::Low,
    },
    ModelEntry {
        alias: "gpt-4o",
        model_id: "gpt-4o",
        provider: ProviderKind::OpenAi,
        max_tokens: 8192,
        temperature: 0.3,
        thinking_budget: ThinkingBudget::None,
    },
    ModelEntry {
        alias: "gpt-4o-mini",
        model_id: "gpt-4o-mini",
        provider: ProviderKind::OpenAi,
        max_tokens: 8192,
        temperature: 0.3,
        thinking_budget: ThinkingBudget::None,
    },
    ModelEntry {
        alias: "o1",
        model_id: "o1",
        provider: ProviderKind::OpenAi,
        max_tokens: 100_000,
        temperature: 1.0,
        thinking_budget: ThinkingBudget::Medium,
    },
    ModelEntry {
        alias: "o3-mini",
        model_id: "o3-mini",
        provider: ProviderKind::OpenAi,
        max_tokens: 100_000,
        temperature: 1.0,
        thinking_budget: ThinkingBudget::Low,
    },
    ModelEntry {
        alias: "gemini-2-0-flash",
        model_id: "gemini-2.0-flash",
        provider: ProviderKind::Gemini,
        max_tokens: 8192,
        temperature: 0.3,
        thinking_budget: ThinkingBudget::None,
    },
    ModelEntry {
        alias: "gemini-1-5-pro",
        model_id: "gemini-1.5-pro-002",
        provider: ProviderKind::Gemini,
        max_tokens: 8192,
        temperature: 0.3,
        thinking_budget: ThinkingBudget::None,
    },
    ModelEntry {
        alias: "deepseek-chat",
        model_id: "deepseek-chat",
        provider: ProviderKind::DeepSeek,
        max_tokens: 8192,
        temperature: 0.3,
        thinking_budget: ThinkingBudget::None,
    },
    ModelEntry {
        alias: "deepseek-reasoner",
        model_id: "deepseek-reasoner",
        provider: ProviderKind::DeepSeek,
        max_tokens: 65_536,
        temperature: 1.0,
        thinking_budget: ThinkingBudget::Low,
    },
];

/// Looks up an alias (or raw model id) in the table.
pub fn lookup(alias: &str) -> Option<&'static ModelEntry> {
    MODEL_TABLE
        .iter()
        .find(|entry| entry.alias == alias || entry.model_id == alias)
}

/// Resolved model: provider family plus generation defaults. Unknown models
/// are routed to the OpenAI-compatible provider as-is.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub provider: ProviderKind,
    pub config: GenConfig,
    pub known: bool,
}

pub fn resolve(alias: &str) -> ResolvedModel {
    match lookup(alias) {
        Some(entry) => ResolvedModel {
            provider: entry.provider,
            config: GenConfig {
                model: entry.model_id.to_string(),
                max_tokens: entry.max_tokens,
                temperature: entry.temperature,
                top_p: None,
                top_k: None,
                stop_sequences: None,
                frequency_penalty: None,
                presence_penalty: None,
                thinking_budget: entry.thinking_budget,
            },
            known: true,
        },
        None => ResolvedModel {
            provider: ProviderKind::OpenAiCompat,
            config: GenConfig {
                model: alias.to_string(),
                max_tokens: defaults::DEFAULT_MAX_TOKENS,
                temperature: defaults::DEFAULT_TEMPERATURE,
                top_p: None,
                top_k: None,
                stop_sequences: None,
                frequency_penalty: None,
                presence_penalty: None,
                thinking_budget: ThinkingBudget::None,
            },
            known: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_alias_resolves_to_its_provider() {
        let resolved = resolve("claude-3-5-sonnet");
        assert_eq!(resolved.provider, ProviderKind::Anthropic);
        assert_eq!(resolved.config.model, "claude-3-5-sonnet-latest");
        assert!(resolved.known);
    }

    #[test]
    fn canonical_id_also_resolves() {
        let resolved = resolve("gpt-4o");
        assert_eq!(resolved.provider, ProviderKind::OpenAi);
    }

    #[test]
    fn unknown_model_falls_back_to_compat() {
        let resolved = resolve("qwen-2.5-coder");
        assert_eq!(resolved.provider, ProviderKind::OpenAiCompat);
        assert_eq!(resolved.config.model, "qwen-2.5-coder");
        assert!(!resolved.known);
    }
}
