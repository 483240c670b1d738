//! Provider-neutral dialog model and generation contract
//!
//! Every backend family (Anthropic, OpenAI, Gemini, DeepSeek, generic
//! OpenAI-compatible) speaks a structurally different wire format. This module
//! defines the single representation the rest of the agent works with: a
//! [`Dialog`] of [`Message`]s made of typed [`Block`]s, and the [`Generator`]
//! trait that adapters and middlewares both implement. The agent loop depends
//! only on this contract, never on a vendor type.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered message history exchanged with a model. Append-only during a run;
/// insertion order is conversation order.
pub type Dialog = Vec<Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    /// Carries tool results back to the model. Rendered as whatever the
    /// vendor expects (a `tool` role, a `user` message with result blocks, a
    /// `functionResponse` part).
    Tool,
}

/// A single content block within a message.
///
/// `ToolCall` blocks appear only in assistant messages; each one must be
/// answered by exactly one `ToolResult` block (matched by id) in the
/// immediately following `Tool` message before the dialog is sent again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Text {
        text: String,
    },
    Thinking {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        /// Which provider family produced this trace. Some providers reject
        /// reasoning traces they did not generate themselves.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        provider: Option<String>,
    },
    ToolCall {
        id: String,
        name: String,
        arguments: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

impl Block {
    pub fn text(text: impl Into<String>) -> Self {
        Block::Text { text: text.into() }
    }

    pub fn is_tool_call(&self) -> bool {
        matches!(self, Block::ToolCall { .. })
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, Block::Thinking { .. })
    }
}

/// A message in a dialog. Immutable once appended, except for metadata
/// annotation through `extra` (e.g. the persistence layer stamping an id
/// after a successful save).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            blocks: vec![Block::text(text)],
            extra: Map::new(),
        }
    }

    pub fn assistant(blocks: Vec<Block>) -> Self {
        Self {
            role: Role::Assistant,
            blocks,
            extra: Map::new(),
        }
    }

    /// One message carrying all of a turn's tool results, in call order.
    pub fn tool_results(blocks: Vec<Block>) -> Self {
        Self {
            role: Role::Tool,
            blocks,
            extra: Map::new(),
        }
    }

    /// The `(id, name, arguments)` of every tool call block, in order.
    pub fn tool_calls(&self) -> Vec<(&str, &str, &Value)> {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::ToolCall {
                    id,
                    name,
                    arguments,
                } => Some((id.as_str(), name.as_str(), arguments)),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.blocks.iter().any(Block::is_tool_call)
    }

    /// Concatenated text blocks, ignoring thinking and tool blocks.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            if let Block::Text { text } = block {
                out.push_str(text);
            }
        }
        out
    }
}

/// Validates the tool-call/result correlation invariant. A dialog with
/// unmatched `ToolCall` blocks is invalid input to any adapter.
pub fn validate_dialog(dialog: &[Message]) -> Result<(), LLMError> {
    if dialog.is_empty() {
        return Err(LLMError::InvalidRequest("dialog is empty".to_string()));
    }
    for (i, msg) in dialog.iter().enumerate() {
        let calls = msg.tool_calls();
        if calls.is_empty() {
            continue;
        }
        let Some(next) = dialog.get(i + 1) else {
            return Err(LLMError::InvalidRequest(format!(
                "assistant message {i} has unanswered tool calls"
            )));
        };
        if next.role != Role::Tool {
            return Err(LLMError::InvalidRequest(format!(
                "message {} must be a tool-result message",
                i + 1
            )));
        }
        let results: Vec<&str> = next
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();
        let call_ids: Vec<&str> = calls.iter().map(|(id, _, _)| *id).collect();
        if call_ids != results {
            return Err(LLMError::InvalidRequest(format!(
                "tool results {results:?} do not match tool calls {call_ids:?}"
            )));
        }
    }
    Ok(())
}

/// Declared shape of an invocable tool, translated into each vendor's
/// function-declaration format at adapter construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-Schema-like object: named properties, types, required list.
    pub input_schema: Value,
}

/// Reasoning-effort knob for models that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingBudget {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl ThinkingBudget {
    pub fn as_effort(&self) -> Option<&'static str> {
        match self {
            ThinkingBudget::None => None,
            ThinkingBudget::Low => Some("low"),
            ThinkingBudget::Medium => Some("medium"),
            ThinkingBudget::High => Some("high"),
        }
    }
}

impl std::str::FromStr for ThinkingBudget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(ThinkingBudget::None),
            "low" => Ok(ThinkingBudget::Low),
            "medium" => Ok(ThinkingBudget::Medium),
            "high" => Ok(ThinkingBudget::High),
            other => Err(format!(
                "unknown thinking budget {other:?} (expected off, low, medium, or high)"
            )),
        }
    }
}

/// Sampling and generation parameters. Immutable per executor run; defaults
/// come from the model alias table and may be overridden by flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    #[serde(default)]
    pub thinking_budget: ThinkingBudget,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cache_read_tokens: Option<u32>,
    pub cache_write_tokens: Option<u32>,
}

/// Result of one generation step: the assistant's next message plus token
/// accounting when the vendor reports it.
#[derive(Debug, Clone)]
pub struct StepResponse {
    pub candidate: Message,
    pub usage: Option<TokenUsage>,
}

/// The single-step generation contract shared by provider adapters and
/// middlewares. Middlewares hold a boxed inner `Generator` and may act before
/// and/or after delegating, forming a chain the agent loop is unaware of.
#[async_trait]
pub trait Generator: Send {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("rate limit exceeded")]
    RateLimit,
    /// Retryable server-side failure (HTTP 5xx).
    #[error("transient provider error: {0}")]
    Transient(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("provider error: {0}")]
    Provider(String),
    /// Vendor-format assumption violated (unexpected content block, malformed
    /// tool call). Never papered over; terminates the run.
    #[error("protocol violation: {0}")]
    Protocol(String),
    /// A middleware could not persist the dialog. Fatal: resumption
    /// guarantees depend on every turn being durably linked.
    #[error("storage error: {0}")]
    Storage(String),
}

impl LLMError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LLMError::RateLimit | LLMError::Transient(_))
    }
}
