//! The agent loop.
//!
//! Each turn alternates between asking the generator for the assistant's
//! next message and executing whatever tool calls it contains. The turn is
//! done when a response carries no tool calls (and, in action-fallback mode,
//! no parseable actions).

use thiserror::Error;
use tracing::debug;

use crate::agent::actions::{self, ParsedAction};
use crate::llm::provider::{Block, Dialog, GenConfig, Generator, LLMError, Message, ToolSpec};
use crate::tools::{ToolError, ToolOutput, ToolRegistry};

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LLMError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

pub struct AgentExecutor {
    generator: Box<dyn Generator>,
    registry: ToolRegistry,
    config: GenConfig,
    dialog: Dialog,
    /// Tool specs snapshot, used by the action parser in fallback mode.
    specs: Vec<ToolSpec>,
    actions_mode: bool,
}

impl AgentExecutor {
    pub fn new(
        generator: Box<dyn Generator>,
        registry: ToolRegistry,
        config: GenConfig,
        dialog: Dialog,
        actions_mode: bool,
    ) -> Self {
        let specs = registry.specs();
        Self {
            generator,
            registry,
            config,
            dialog,
            specs,
            actions_mode,
        }
    }

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    /// Runs one user turn to completion and returns the final assistant
    /// text.
    pub async fn run(&mut self, user_input: &str) -> Result<String, AgentError> {
        self.dialog.push(Message::user(user_input));
        loop {
            let resp = self
                .generator
                .generate(&mut self.dialog, &self.config)
                .await?;
            let candidate = resp.candidate;
            self.dialog.push(candidate.clone());

            if candidate.has_tool_calls() {
                let results = self.execute_tool_calls(&candidate).await?;
                self.dialog.push(Message::tool_results(results));
                continue;
            }

            if self.actions_mode {
                let parsed = actions::parse_actions(&candidate.text(), &self.specs);
                if !parsed.is_empty() {
                    let feedback = self.execute_actions(parsed).await?;
                    self.dialog.push(Message::user(feedback));
                    continue;
                }
            }

            debug!(turns = self.dialog.len(), "turn complete");
            return Ok(candidate.text());
        }
    }

    async fn execute_tool_calls(&self, candidate: &Message) -> Result<Vec<Block>, AgentError> {
        let mut results = Vec::new();
        for (id, name, arguments) in candidate.tool_calls() {
            debug!(tool = name, "dispatching tool call");
            let output = self.registry.dispatch(name, arguments.clone()).await?;
            results.push(Block::ToolResult {
                tool_use_id: id.to_string(),
                content: output.content,
                is_error: output.is_error,
            });
        }
        Ok(results)
    }

    async fn execute_actions(
        &self,
        parsed: Vec<Result<ParsedAction, String>>,
    ) -> Result<String, AgentError> {
        let mut rendered = Vec::new();
        for action in parsed {
            match action {
                Ok(action) => {
                    let output = self
                        .registry
                        .dispatch(&action.name, action.arguments)
                        .await?;
                    rendered.push(actions::render_result(&action.name, &output));
                }
                Err(message) => {
                    rendered.push(actions::render_result("parse", &ToolOutput::error(message)));
                }
            }
        }
        Ok(rendered.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{StepResponse, ThinkingBudget};
    use async_trait::async_trait;
    use serde_json::{Value, json};

    /// Replays a fixed script of responses.
    struct ScriptedGenerator {
        script: Vec<Message>,
    }

    #[async_trait]
    impl Generator for ScriptedGenerator {
        async fn generate(
            &mut self,
            _dialog: &mut Dialog,
            _config: &GenConfig,
        ) -> Result<StepResponse, LLMError> {
            if self.script.is_empty() {
                return Err(LLMError::Provider("script exhausted".to_string()));
            }
            Ok(StepResponse {
                candidate: self.script.remove(0),
                usage: None,
            })
        }
    }

    struct EchoTool;

    #[async_trait]
    impl crate::tools::Tool for EchoTool {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "echo"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }

        async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
            let text = args
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            Ok(ToolOutput::ok(format!("echo: {text}")))
        }
    }

    fn config() -> GenConfig {
        GenConfig {
            model: "m".to_string(),
            max_tokens: 100,
            temperature: 0.0,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            frequency_penalty: None,
            presence_penalty: None,
            thinking_budget: ThinkingBudget::None,
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).expect("register");
        registry
    }

    #[tokio::test]
    async fn loop_runs_tools_until_a_plain_response() {
        let script = vec![
            Message::assistant(vec![Block::ToolCall {
                id: "c1".to_string(),
                name: "echo".to_string(),
                arguments: json!({"text": "one"}),
            }]),
            Message::assistant(vec![Block::text("all done")]),
        ];
        let mut executor = AgentExecutor::new(
            Box::new(ScriptedGenerator { script }),
            registry(),
            config(),
            Vec::new(),
            false,
        );
        let answer = executor.run("go").await.expect("run");
        assert_eq!(answer, "all done");

        // user, assistant(tool call), tool results, assistant(final)
        let dialog = executor.dialog();
        assert_eq!(dialog.len(), 4);
        assert!(matches!(
            dialog[2].blocks[0],
            Block::ToolResult { ref content, .. } if content == "echo: one"
        ));
    }

    #[tokio::test]
    async fn unknown_tool_call_aborts_the_turn() {
        let script = vec![Message::assistant(vec![Block::ToolCall {
            id: "c1".to_string(),
            name: "missing".to_string(),
            arguments: json!({}),
        }])];
        let mut executor = AgentExecutor::new(
            Box::new(ScriptedGenerator { script }),
            registry(),
            config(),
            Vec::new(),
            false,
        );
        let err = executor.run("go").await.unwrap_err();
        assert!(matches!(err, AgentError::Tool(ToolError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn actions_mode_feeds_results_back_as_text() {
        let script = vec![
            Message::assistant(vec![Block::text(
                "<echo>{\"text\": \"hi\"}</echo>",
            )]),
            Message::assistant(vec![Block::text("done")]),
        ];
        let mut executor = AgentExecutor::new(
            Box::new(ScriptedGenerator { script }),
            registry(),
            config(),
            Vec::new(),
            true,
        );
        let answer = executor.run("go").await.expect("run");
        assert_eq!(answer, "done");

        let dialog = executor.dialog();
        // user, assistant(action), user(results), assistant(final)
        assert_eq!(dialog.len(), 4);
        assert!(dialog[2].text().contains("echo: hi"));
    }

    #[tokio::test]
    async fn plain_response_ends_immediately() {
        let script = vec![Message::assistant(vec![Block::text("quick answer")])];
        let mut executor = AgentExecutor::new(
            Box::new(ScriptedGenerator { script }),
            registry(),
            config(),
            Vec::new(),
            false,
        );
        let answer = executor.run("hi").await.expect("run");
        assert_eq!(answer, "quick answer");
        assert_eq!(executor.dialog().len(), 2);
    }
}
