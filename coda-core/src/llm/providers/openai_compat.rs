//! Chat-completions codec shared by every OpenAI-compatible backend.
//!
//! The OpenAI, DeepSeek, and custom-endpoint adapters all speak this wire
//! format; they differ only in base URL, key, and which reasoning knobs they
//! accept. Tool results travel as one `tool`-role message per result block,
//! correlated by `tool_call_id`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::constants::defaults;
use crate::llm::provider::{
    Block, Dialog, GenConfig, Generator, LLMError, Message, Role, StepResponse, TokenUsage,
    ToolSpec, validate_dialog,
};
use crate::llm::retry::{RetryPolicy, with_retry};
use crate::llm::truncate::{TruncationPolicy, truncate_result};

use super::classify_status;

pub struct OpenAiCompatProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    provider_name: String,
    system_prompt: String,
    tools: Vec<Value>,
    /// Whether the backend accepts `reasoning_effort` (OpenAI reasoning
    /// models do; most compatible servers ignore or reject it).
    supports_reasoning_effort: bool,
    retry: RetryPolicy,
    truncation: TruncationPolicy,
}

impl OpenAiCompatProvider {
    pub fn new(
        provider_name: impl Into<String>,
        base_url: String,
        api_key: String,
        system_prompt: String,
        tool_specs: &[ToolSpec],
    ) -> Self {
        let tools = tool_specs
            .iter()
            .map(|spec| {
                json!({
                    "type": "function",
                    "function": {
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": spec.input_schema,
                    }
                })
            })
            .collect();
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            provider_name: provider_name.into(),
            system_prompt,
            tools,
            supports_reasoning_effort: false,
            retry: RetryPolicy::default(),
            truncation: TruncationPolicy::default(),
        }
    }

    pub fn with_reasoning_effort(mut self, supported: bool) -> Self {
        self.supports_reasoning_effort = supported;
        self
    }

    pub fn with_policies(mut self, retry: RetryPolicy, truncation: TruncationPolicy) -> Self {
        self.retry = retry;
        self.truncation = truncation;
        self
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn convert_dialog(&self, dialog: &[Message], config: &GenConfig) -> Result<Value, LLMError> {
        let mut messages: Vec<Value> = Vec::with_capacity(dialog.len() + 1);
        messages.push(json!({"role": "system", "content": self.system_prompt}));

        for msg in dialog {
            match msg.role {
                Role::User => {
                    messages.push(json!({"role": "user", "content": msg.text()}));
                }
                Role::Assistant => {
                    let mut message = json!({"role": "assistant"});
                    let text = msg.text();
                    message["content"] = if text.is_empty() {
                        Value::Null
                    } else {
                        json!(text)
                    };
                    let tool_calls: Vec<Value> = msg
                        .tool_calls()
                        .into_iter()
                        .map(|(id, name, arguments)| {
                            json!({
                                "id": id,
                                "type": "function",
                                "function": {
                                    "name": name,
                                    "arguments": arguments.to_string(),
                                }
                            })
                        })
                        .collect();
                    if !tool_calls.is_empty() {
                        message["tool_calls"] = json!(tool_calls);
                    }
                    messages.push(message);
                }
                Role::Tool => {
                    for block in &msg.blocks {
                        if let Block::ToolResult {
                            tool_use_id,
                            content,
                            is_error: _,
                        } = block
                        {
                            messages.push(json!({
                                "role": "tool",
                                "tool_call_id": tool_use_id,
                                "content": truncate_result(content, &self.truncation),
                            }));
                        }
                    }
                }
            }
        }

        let mut request = json!({
            "model": config.model,
            "messages": messages,
            "temperature": config.temperature,
        });
        let effort = config.thinking_budget.as_effort();
        if self.supports_reasoning_effort && effort.is_some() {
            request["max_completion_tokens"] = json!(config.max_tokens);
            request["reasoning_effort"] = json!(effort);
        } else {
            request["max_tokens"] = json!(config.max_tokens);
        }
        if let Some(top_p) = config.top_p {
            request["top_p"] = json!(top_p);
        }
        if let Some(stop) = &config.stop_sequences {
            request["stop"] = json!(stop);
        }
        if let Some(penalty) = config.frequency_penalty {
            request["frequency_penalty"] = json!(penalty);
        }
        if let Some(penalty) = config.presence_penalty {
            request["presence_penalty"] = json!(penalty);
        }
        if !self.tools.is_empty() {
            request["tools"] = json!(self.tools);
        }
        Ok(request)
    }

    fn parse_response(&self, body: Value) -> Result<StepResponse, LLMError> {
        let message = body
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .ok_or_else(|| {
                LLMError::Protocol(format!(
                    "{}: response missing choices[0].message",
                    self.provider_name
                ))
            })?;

        let mut blocks = Vec::new();
        // DeepSeek-style reasoning traces arrive in a dedicated field.
        if let Some(reasoning) = message.get("reasoning_content").and_then(|r| r.as_str()) {
            if !reasoning.is_empty() {
                blocks.push(Block::Thinking {
                    text: reasoning.to_string(),
                    signature: None,
                    provider: Some(self.provider_name.clone()),
                });
            }
        }
        if let Some(content) = message.get("content").and_then(|c| c.as_str()) {
            if !content.is_empty() {
                blocks.push(Block::text(content));
            }
        }
        if let Some(tool_calls) = message.get("tool_calls").and_then(|t| t.as_array()) {
            for call in tool_calls {
                let id = call.get("id").and_then(|v| v.as_str()).ok_or_else(|| {
                    LLMError::Protocol(format!(
                        "{}: tool call without id",
                        self.provider_name
                    ))
                })?;
                let function = call.get("function").ok_or_else(|| {
                    LLMError::Protocol(format!(
                        "{}: tool call without function",
                        self.provider_name
                    ))
                })?;
                let name = function.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
                    LLMError::Protocol(format!(
                        "{}: tool call without function name",
                        self.provider_name
                    ))
                })?;
                let raw_arguments = function
                    .get("arguments")
                    .and_then(|v| v.as_str())
                    .unwrap_or("{}");
                let arguments: Value = serde_json::from_str(raw_arguments).map_err(|e| {
                    LLMError::Protocol(format!(
                        "{}: malformed tool call arguments for {name}: {e}",
                        self.provider_name
                    ))
                })?;
                blocks.push(Block::ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                });
            }
        }

        let usage = body.get("usage").map(|usage| TokenUsage {
            input_tokens: usage
                .get("prompt_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            output_tokens: usage
                .get("completion_tokens")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            cache_read_tokens: usage
                .get("prompt_tokens_details")
                .and_then(|d| d.get("cached_tokens"))
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
            cache_write_tokens: None,
        });

        Ok(StepResponse {
            candidate: Message::assistant(blocks),
            usage,
        })
    }

    async fn post(&self, request: &Value) -> Result<StepResponse, LLMError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LLMError::Network(format!("{}: {e}", self.provider_name)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(&self.provider_name, status, &body));
        }
        let body: Value = response.json().await.map_err(|e| {
            LLMError::Provider(format!(
                "{}: failed to parse response: {e}",
                self.provider_name
            ))
        })?;
        self.parse_response(body)
    }
}

#[async_trait]
impl Generator for OpenAiCompatProvider {
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
