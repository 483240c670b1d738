//! Session assembly: opens the store, rebuilds or starts a dialog, resolves
//! the model, and stacks the middleware chain onto the vendor adapter.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::agent::executor::AgentExecutor;
use crate::agent::middleware::{
    ResponsePrinter, SavingGenerator, ThinkingFilter, TokenUsageGenerator, ToolResultPrinter,
};
use crate::agent::actions;
use crate::config::models::{self, ResolvedModel};
use crate::config::{resolve_custom_url, tools_disabled};
use crate::convo::store::{MessageStore, StoreError};
use crate::llm::factory::build_provider;
use crate::llm::provider::{Block, Dialog, Generator, LLMError, ThinkingBudget};
use crate::prompts::system_prompt;
use crate::tools::{ToolError, Workspace, default_registry};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("no conversation to continue")]
    NoConversation,
    #[error(
        "conversation was generated by {stored} and cannot continue under {requested}: \
         its reasoning blocks belong to a different provider"
    )]
    IncompatibleModel { stored: String, requested: String },
    #[error("cannot continue a conversation generated by {stored} under {requested}")]
    ModelMismatch { stored: String, requested: String },
}

/// Which dialog to start from.
pub enum ResumeTarget {
    /// Fresh conversation.
    New,
    /// The most recent leaf in the store.
    Latest,
    /// A specific conversation (leaf message id).
    Conversation(String),
}

pub struct SessionOptions {
    pub model: Option<String>,
    pub custom_url: Option<String>,
    pub resume: ResumeTarget,
    pub store_path: PathBuf,
    pub workspace_root: PathBuf,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
    pub stop_sequences: Vec<String>,
    pub thinking: Option<ThinkingBudget>,
}

/// Resume check: a stored conversation continues under the model that
/// generated it. Runs before any network traffic.
fn check_stored_model(
    stored: Option<&str>,
    resolved: &ResolvedModel,
) -> Result<(), SessionError> {
    match stored {
        Some(stored) if stored != resolved.config.model => Err(SessionError::ModelMismatch {
            stored: stored.to_string(),
            requested: resolved.config.model.clone(),
        }),
        _ => Ok(()),
    }
}

/// Provider-portability check on resume: a dialog carrying reasoning blocks
/// signed by one provider cannot be replayed under another. This runs before
/// any network traffic.
fn check_model_compat(dialog: &Dialog, resolved: &ResolvedModel) -> Result<(), SessionError> {
    let requested = resolved.provider.name();
    for message in dialog {
        for block in &message.blocks {
            if let Block::Thinking {
                provider: Some(provider),
                ..
            } = block
            {
                if provider != requested {
                    return Err(SessionError::IncompatibleModel {
                        stored: provider.clone(),
                        requested: requested.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Builds a ready-to-run executor from CLI-level options.
pub fn build_session(options: SessionOptions) -> Result<AgentExecutor, SessionError> {
    let store = MessageStore::open(&options.store_path)?;

    let (dialog, stored_model) = match &options.resume {
        ResumeTarget::New => (Vec::new(), None),
        ResumeTarget::Latest => {
            let leaf = store.latest_leaf().ok_or(SessionError::NoConversation)?;
            let (dialog, model) = store.dialog_from_leaf(&leaf.id.clone())?;
            (dialog, Some(model))
        }
        ResumeTarget::Conversation(id) => {
            let (dialog, model) = store.dialog_from_leaf(id)?;
            (dialog, Some(model))
        }
    };

    // Flag wins; otherwise resume with the conversation's own model. A flag
    // that names a different model than the one stored is rejected below.
    let alias = options
        .model
        .clone()
        .or_else(|| stored_model.clone())
        .unwrap_or_else(|| models::DEFAULT_MODEL.to_string());
    let resolved = models::resolve(&alias);
    check_stored_model(stored_model.as_deref(), &resolved)?;
    check_model_compat(&dialog, &resolved)?;

    let mut config = resolved.config.clone();
    if let Some(max_tokens) = options.max_tokens {
        config.max_tokens = max_tokens;
    }
    if let Some(temperature) = options.temperature {
        config.temperature = temperature;
    }
    if options.top_p.is_some() {
        config.top_p = options.top_p;
    }
    if options.top_k.is_some() {
        config.top_k = options.top_k;
    }
    if options.frequency_penalty.is_some() {
        config.frequency_penalty = options.frequency_penalty;
    }
    if options.presence_penalty.is_some() {
        config.presence_penalty = options.presence_penalty;
    }
    if !options.stop_sequences.is_empty() {
        config.stop_sequences = Some(options.stop_sequences.clone());
    }
    if let Some(thinking) = options.thinking {
        config.thinking_budget = thinking;
    }

    let workspace = Arc::new(Workspace::new(options.workspace_root.clone()));
    let registry = default_registry(workspace)?;

    let actions_mode = tools_disabled();
    let mut system = system_prompt(&options.workspace_root);
    let tool_specs = if actions_mode {
        system.push_str("\n\n");
        system.push_str(&actions::instructions(&registry.specs()));
        Vec::new()
    } else {
        registry.specs()
    };

    let custom_url = resolve_custom_url(&config.model, options.custom_url.as_deref());
    info!(model = %config.model, provider = resolved.provider.name(), "starting session");

    let adapter = build_provider(&resolved, custom_url, system, &tool_specs)?;

    // Innermost first: the filter sits on the adapter, persistence wraps
    // everything.
    let chain: Box<dyn Generator> = Box::new(ThinkingFilter::new(adapter));
    let chain: Box<dyn Generator> = Box::new(ResponsePrinter::new(chain));
    let chain: Box<dyn Generator> = Box::new(ToolResultPrinter::new(chain));
    let chain: Box<dyn Generator> = Box::new(TokenUsageGenerator::new(chain));
    let chain: Box<dyn Generator> =
        Box::new(SavingGenerator::new(chain, store, config.model.clone()));

    Ok(AgentExecutor::new(
        chain,
        registry,
        config.clone(),
        dialog,
        actions_mode,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Message;

    #[test]
    fn thinking_from_another_provider_blocks_resume() {
        let dialog = vec![Message::assistant(vec![Block::Thinking {
            text: "trace".to_string(),
            signature: None,
            provider: Some("anthropic".to_string()),
        }])];
        let resolved = models::resolve("deepseek-chat");
        assert!(matches!(
            check_model_compat(&dialog, &resolved),
            Err(SessionError::IncompatibleModel { .. })
        ));
    }

    #[test]
    fn same_provider_thinking_is_fine() {
        let dialog = vec![Message::assistant(vec![Block::Thinking {
            text: "trace".to_string(),
            signature: None,
            provider: Some("anthropic".to_string()),
        }])];
        let resolved = models::resolve("claude-3-7-sonnet");
        assert!(check_model_compat(&dialog, &resolved).is_ok());
    }

    #[test]
    fn resuming_under_a_different_model_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("messages.jsonl");
        {
            let mut store = MessageStore::open(&path).expect("open");
            let mut dialog = vec![Message::user("hi")];
            store.save_dialog(&mut dialog, "gpt-4o").expect("save");
        }

        let err = build_session(SessionOptions {
            model: Some("claude-3-5-sonnet".to_string()),
            custom_url: None,
            resume: ResumeTarget::Latest,
            store_path: path,
            workspace_root: dir.path().to_path_buf(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            top_k: None,
            frequency_penalty: None,
            presence_penalty: None,
            stop_sequences: Vec::new(),
            thinking: None,
        })
        .err()
        .expect("resume under another model must fail");
        assert!(matches!(err, SessionError::ModelMismatch { .. }));
    }

    #[test]
    fn an_alias_for_the_stored_model_is_accepted() {
        let resolved = models::resolve("gpt-4o");
        assert!(check_stored_model(Some("gpt-4o"), &resolved).is_ok());
        assert!(check_stored_model(None, &resolved).is_ok());
        assert!(matches!(
            check_stored_model(Some("deepseek-chat"), &resolved),
            Err(SessionError::ModelMismatch { .. })
        ));
    }

    #[test]
    fn untagged_thinking_is_portable() {
        let dialog = vec![Message::assistant(vec![Block::Thinking {
            text: "trace".to_string(),
            signature: None,
            provider: None,
        }])];
        let resolved = models::resolve("gpt-4o");
        assert!(check_model_compat(&dialog, &resolved).is_ok());
    }
}
