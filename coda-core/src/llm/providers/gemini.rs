//! Gemini adapter.
//!
//! Gemini's function calls carry no ids, so the adapter synthesizes
//! `call-{n}` ids when parsing and maps ids back to function names when
//! converting results (function responses are correlated by name on the
//! wire).

use std::collections::HashMap;
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

pub struct GeminiProvider {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    system_prompt: String,
    tools: Vec<Value>,
    retry: RetryPolicy,
    truncation: TruncationPolicy,
}

impl GeminiProvider {
    pub fn new(api_key: String, system_prompt: String, tool_specs: &[ToolSpec]) -> Self {
        Self::with_base_url(
            api_key,
            urls::GEMINI_API_BASE.to_string(),
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
        let declarations: Vec<Value> = tool_specs
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "parameters": spec.input_schema,
                })
            })
            .collect();
        let tools = if declarations.is_empty() {
            Vec::new()
        } else {
            vec![json!({"functionDeclarations": declarations})]
        };
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            system_prompt,
            tools,
            retry: RetryPolicy::default(),
            truncation: TruncationPolicy::default(),
        }
    }

    pub fn with_policies(mut self, retry: RetryPolicy, truncation: TruncationPolicy) -> Self {
        self.retry = retry;
        self.truncation = truncation;
        self
    }

    fn convert_dialog(&self, dialog: &[Message], config: &GenConfig) -> Result<Value, LLMError> {
        // Call ids are local to this adapter; recover the function name each
        // result refers to from the assistant turns seen so far.
        let mut call_names: HashMap<String, String> = HashMap::new();
        let mut contents: Vec<Value> = Vec::with_capacity(dialog.len());

        for msg in dialog {
            match msg.role {
                Role::User => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": msg.text()}],
                    }));
                }
                Role::Assistant => {
                    let mut parts: Vec<Value> = Vec::new();
                    for block in &msg.blocks {
                        match block {
                            Block::Text { text } => parts.push(json!({"text": text})),
                            Block::Thinking { .. } => {}
                            Block::ToolCall {
                                id,
                                name,
                                arguments,
                            } => {
                                call_names.insert(id.clone(), name.clone());
                                parts.push(json!({
                                    "functionCall": {"name": name, "args": arguments},
                                }));
                            }
                            Block::ToolResult { .. } => {
                                return Err(LLMError::Protocol(
                                    "gemini: tool result in assistant message".to_string(),
                                ));
                            }
                        }
                    }
                    if !parts.is_empty() {
                        contents.push(json!({"role": "model", "parts": parts}));
                    }
                }
                Role::Tool => {
                    let mut parts: Vec<Value> = Vec::new();
                    for block in &msg.blocks {
                        if let Block::ToolResult {
                            tool_use_id,
                            content,
                            is_error,
                        } = block
                        {
                            let name = call_names.get(tool_use_id).ok_or_else(|| {
                                LLMError::Protocol(format!(
                                    "gemini: tool result for unknown call {tool_use_id}"
                                ))
                            })?;
                            let output = truncate_result(content, &self.truncation);
                            let response = if *is_error {
                                json!({"error": output})
                            } else {
                                json!({"output": output})
                            };
                            parts.push(json!({
                                "functionResponse": {"name": name, "response": response},
                            }));
                        }
                    }
                    contents.push(json!({"role": "user", "parts": parts}));
                }
            }
        }

        let mut generation_config = json!({
            "maxOutputTokens": config.max_tokens,
            "temperature": config.temperature,
        });
        if let Some(top_p) = config.top_p {
            generation_config["topP"] = json!(top_p);
        }
        if let Some(top_k) = config.top_k {
            generation_config["topK"] = json!(top_k);
        }
        if let Some(stop) = &config.stop_sequences {
            generation_config["stopSequences"] = json!(stop);
        }
        if let Some(budget) = thinking_budget_tokens(config.thinking_budget) {
            generation_config["thinkingConfig"] = json!({"thinkingBudget": budget});
        }

        let mut request = json!({
            "contents": contents,
            "systemInstruction": {"parts": [{"text": self.system_prompt}]},
            "generationConfig": generation_config,
        });
        if !self.tools.is_empty() {
            request["tools"] = json!(self.tools);
        }
        Ok(request)
    }

    fn parse_response(&self, body: Value) -> Result<StepResponse, LLMError> {
        let parts = body
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|candidate| candidate.pointer("/content/parts"))
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                LLMError::Protocol("gemini: response missing candidate parts".to_string())
            })?;

        let mut blocks = Vec::new();
        let mut call_index = 0usize;
        for part in parts {
            if let Some(text) = part.get("text").and_then(|t| t.as_str()) {
                if !text.is_empty() {
                    blocks.push(Block::text(text));
                }
            } else if let Some(call) = part.get("functionCall") {
                let name = call.get("name").and_then(|n| n.as_str()).ok_or_else(|| {
                    LLMError::Protocol("gemini: function call without name".to_string())
                })?;
                let arguments = call.get("args").cloned().unwrap_or_else(|| json!({}));
                blocks.push(Block::ToolCall {
                    id: format!("call-{call_index}"),
                    name: name.to_string(),
                    arguments,
                });
                call_index += 1;
            } else {
                return Err(LLMError::Protocol(format!(
                    "gemini: unsupported response part: {part}"
                )));
            }
        }

        let usage = body.get("usageMetadata").map(|usage| TokenUsage {
            input_tokens: usage
                .get("promptTokenCount")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            output_tokens: usage
                .get("candidatesTokenCount")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            cache_read_tokens: usage
                .get("cachedContentTokenCount")
                .and_then(|v| v.as_u64())
                .map(|v| v as u32),
            cache_write_tokens: None,
        });

        Ok(StepResponse {
            candidate: Message::assistant(blocks),
            usage,
        })
    }

    async fn post(&self, model: &str, request: &Value) -> Result<StepResponse, LLMError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .timeout(Duration::from_secs(defaults::REQUEST_TIMEOUT_SECS))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LLMError::Network(format!("gemini: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(providers::GEMINI, status, &body));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| LLMError::Provider(format!("gemini: failed to parse response: {e}")))?;
        self.parse_response(body)
    }
}

#[async_trait]
impl Generator for GeminiProvider {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        validate_dialog(dialog)?;
        let request = self.convert_dialog(dialog, config)?;
        with_retry(&self.retry, || self.post(&config.model, &request)).await
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
