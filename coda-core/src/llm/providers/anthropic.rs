//! Anthropic Messages API adapter.
//!
//! Tool results travel back as `user` messages carrying `tool_result`
//! blocks, and ephemeral cache markers are rotated onto the most recent and
//! third-most-recent messages on every request (only a bounded number of
//! cache breakpoints may be active at once).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::constants::{defaults, providers, thinking, urls};
use crate::llm::provider::{
    Block, Dialog, GenConfig, Generator, LLMError, Message, Role, StepResponse, ThinkingBudget,
    TokenUsage, ToolSpec, validate_dialog,
};
use crate::llm::retry::{RetryPolicy, with_retry};
use crate::llm::truncate::{TruncationPolicy, truncate_result};

use super::classify_status;

pub struct AnthropicProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    system_prompt: String,
    /// Tool declarations in vendor format, translated once at construction.
    tools: Vec<Value>,
    retry: RetryPolicy,
    truncation: TruncationPolicy,
}

impl AnthropicProvider {
    pub fn new(api_key: String, system_prompt: String, tool_specs: &[ToolSpec]) -> Self {
        let tools = tool_specs
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "input_schema": spec.input_schema,
                })
            })
            .collect();
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            base_url: urls::ANTHROPIC_API_BASE.to_string(),
            system_prompt,
            tools,
            retry: RetryPolicy::default(),
            truncation: TruncationPolicy::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_policies(mut self, retry: RetryPolicy, truncation: TruncationPolicy) -> Self {
        self.retry = retry;
        self.truncation = truncation;
        self
    }

    fn convert_dialog(&self, dialog: &[Message], config: &GenConfig) -> Result<Value, LLMError> {
        let mut messages: Vec<Value> = Vec::with_capacity(dialog.len());

        for msg in dialog {
            let mut content: Vec<Value> = Vec::new();
            match msg.role {
                Role::User => {
                    for block in &msg.blocks {
                        if let Block::Text { text } = block {
                            content.push(json!({"type": "text", "text": text}));
                        }
                    }
                }
                Role::Assistant => {
                    for block in &msg.blocks {
                        match block {
                            Block::Text { text } => {
                                content.push(json!({"type": "text", "text": text}));
                            }
                            Block::Thinking {
                                text, signature, ..
                            } => {
                                let mut thinking = json!({
                                    "type": "thinking",
                                    "thinking": text,
                                });
                                if let Some(sig) = signature {
                                    thinking["signature"] = json!(sig);
                                }
                                content.push(thinking);
                            }
                            Block::ToolCall {
                                id,
                                name,
                                arguments,
                            } => {
                                content.push(json!({
                                    "type": "tool_use",
                                    "id": id,
                                    "name": name,
                                    "input": arguments,
                                }));
                            }
                            Block::ToolResult { .. } => {
                                return Err(LLMError::InvalidRequest(
                                    "tool result block in assistant message".to_string(),
                                ));
                            }
                        }
                    }
                }
                Role::Tool => {
                    for block in &msg.blocks {
                        if let Block::ToolResult {
                            tool_use_id,
                            content: result,
                            is_error,
                        } = block
                        {
                            content.push(json!({
                                "type": "tool_result",
                                "tool_use_id": tool_use_id,
                                "content": truncate_result(result, &self.truncation),
                                "is_error": is_error,
                            }));
                        }
                    }
                }
            }
            if content.is_empty() {
                continue;
            }
            let role = match msg.role {
                Role::Assistant => "assistant",
                // Tool results are user messages on this API.
                Role::User | Role::Tool => "user",
            };
            messages.push(json!({"role": role, "content": content}));
        }

        if messages.is_empty() {
            return Err(LLMError::InvalidRequest(
                "no convertible messages for Anthropic request".to_string(),
            ));
        }

        apply_cache_markers(&mut messages);

        let mut request = json!({
            "model": config.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "system": self.system_prompt,
            "messages": messages,
        });
        if let Some(top_p) = config.top_p {
            request["top_p"] = json!(top_p);
        }
        if let Some(top_k) = config.top_k {
            request["top_k"] = json!(top_k);
        }
        if let Some(stop) = &config.stop_sequences {
            request["stop_sequences"] = json!(stop);
        }
        if !self.tools.is_empty() {
            request["tools"] = json!(self.tools);
        }
        if let Some(budget) = thinking_budget_tokens(config.thinking_budget) {
            request["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
        }
        Ok(request)
    }

    fn parse_response(&self, body: Value) -> Result<StepResponse, LLMError> {
        let content = body
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| {
                LLMError::Protocol("anthropic: response missing content array".to_string())
            })?;

        let mut blocks = Vec::with_capacity(content.len());
        for block in content {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    let text = block.get("text").and_then(|t| t.as_str()).unwrap_or("");
                    blocks.push(Block::text(text));
                }
                Some("thinking") => {
                    blocks.push(Block::Thinking {
                        text: block
                            .get("thinking")
                            .and_then(|t| t.as_str())
                            .unwrap_or("")
                            .to_string(),
                        signature: block
                            .get("signature")
                            .and_then(|s| s.as_str())
                            .map(str::to_string),
                        provider: Some(providers::ANTHROPIC.to_string()),
                    });
                }
                Some("tool_use") => {
                    let id = block.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                        LLMError::Protocol("anthropic: tool_use block without id".to_string())
                    })?;
                    let name = block.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
                        LLMError::Protocol("anthropic: tool_use block without name".to_string())
                    })?;
                    let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                    blocks.push(Block::ToolCall {
                        id: id.to_string(),
                        name: name.to_string(),
                        arguments: input,
                    });
                }
                other => {
                    return Err(LLMError::Protocol(format!(
                        "anthropic: unexpected content block type: {other:?}"
                    )));
                }
            }
        }

        let usage = body.get("usage").map(|usage| TokenUsage {
            input_tokens: read_u32(usage, "input_tokens"),
            output_tokens: read_u32(usage, "output_tokens"),
            cache_read_tokens: usage
                .get("cache_read_input_tokens")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
            cache_write_tokens: usage
                .get("cache_creation_input_tokens")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
        });

        Ok(StepResponse {
            candidate: Message::assistant(blocks),
            usage,
        })
    }

    async fn post(&self, request: &Value) -> Result<StepResponse, LLMError> {
        let url = format!("{}/messages", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", urls::ANTHROPIC_API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| LLMError::Network(format!("anthropic: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(providers::ANTHROPIC, status, &body));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("anthropic: failed to parse response: {e}")))?;
        self.parse_response(body)
    }
}

#[async_trait]
impl Generator for AnthropicProvider {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        validate_dialog(dialog)?;
        let request = self.convert_dialog(dialog, config)?;
        with_retry(&self.retry, || self.post(&request)).await
    }
}

fn thinking_budget_tokens(budget: ThinkingBudget) -> Option<u32> {
    match budget {
        ThinkingBudget::None => None,
        ThinkingBudget::Low => Some(thinking::LOW_BUDGET_TOKENS),
        ThinkingBudget::Medium => Some(thinking::MEDIUM_BUDGET_TOKENS),
        ThinkingBudget::High => Some(thinking::HIGH_BUDGET_TOKENS),
    }
}

fn read_u32(value: &Value, key: &str) -> u32 {
    value.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32
}

/// Rotates ephemeral cache markers: clears every existing marker, then marks
/// the last block of the last message and, when at least three messages
/// exist, the last block of the third-to-last message.
fn apply_cache_markers(messages: &mut [Value]) {
    for message in messages.iter_mut() {
        if let Some(blocks) = message.get_mut("content").and_then(|c| c.as_array_mut()) {
            for block in blocks {
                if let Some(obj) = block.as_object_mut() {
                    obj.remove("cache_control");
                }
            }
        }
    }

    let len = messages.len();
    mark_last_block(&mut messages[len - 1]);
    if len >= 3 {
        mark_last_block(&mut messages[len - 3]);
    }
}

fn mark_last_block(message: &mut Value) {
    if let Some(block) = message
        .get_mut("content")
        .and_then(|c| c.as_array_mut())
        .and_then(|blocks| blocks.last_mut())
    {
        block["cache_control"] = json!({"type": "ephemeral"});
    }
}
