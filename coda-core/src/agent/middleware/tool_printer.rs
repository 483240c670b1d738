//! Prints tool results as they head back to the model, capped to keep huge
//! outputs from flooding the terminal.
//!
//! Results are labeled with the tool's name, correlated through the tool-use
//! id of the matching call in the preceding assistant message.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::constants::defaults;
use crate::llm::provider::{Block, Dialog, GenConfig, Generator, LLMError, Role, StepResponse};

const UNKNOWN_TOOL_LABEL: &str = "unknown tool";

pub struct ToolResultPrinter {
    inner: Box<dyn Generator>,
    max_lines: usize,
}

impl ToolResultPrinter {
    pub fn new(inner: Box<dyn Generator>) -> Self {
        Self {
            inner,
            max_lines: defaults::TOOL_PRINT_MAX_LINES,
        }
    }

    fn clip(&self, content: &str) -> String {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() <= self.max_lines {
            return content.to_string();
        }
        let mut clipped = lines[..self.max_lines].join("\n");
        clipped.push_str(&format!(
            "\n... ({} more lines)",
            lines.len() - self.max_lines
        ));
        clipped
    }

    /// One rendered entry per tool result in the trailing Tool message, in
    /// order. Names come from the preceding assistant message's calls.
    fn render(&self, dialog: &Dialog) -> Vec<String> {
        let [.., caller, last] = dialog.as_slice() else {
            return Vec::new();
        };
        if last.role != Role::Tool {
            return Vec::new();
        }
        let names: HashMap<&str, &str> = caller
            .tool_calls()
            .into_iter()
            .map(|(id, name, _)| (id, name))
            .collect();

        let mut rendered = Vec::new();
        for block in &last.blocks {
            if let Block::ToolResult {
                tool_use_id,
                content,
                is_error,
            } = block
            {
                let name = names
                    .get(tool_use_id.as_str())
                    .copied()
                    .unwrap_or(UNKNOWN_TOOL_LABEL);
                let label = if *is_error {
                    format!("{name} error")
                } else {
                    name.to_string()
                };
                rendered.push(format!("[{label}]\n{}", self.clip(content)));
            }
        }
        rendered
    }
}

#[async_trait]
impl Generator for ToolResultPrinter {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        for entry in self.render(dialog) {
            println!("{entry}");
        }
        self.inner.generate(dialog, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Message;
    use serde_json::json;

    fn printer(max_lines: usize) -> ToolResultPrinter {
        ToolResultPrinter {
            inner: Box::new(NoopGenerator),
            max_lines,
        }
    }

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(printer(3).clip("a\nb"), "a\nb");
    }

    #[test]
    fn long_output_is_clipped_with_a_count() {
        let clipped = printer(2).clip("a\nb\nc\nd\ne");
        assert_eq!(clipped, "a\nb\n... (3 more lines)");
    }

    #[test]
    fn results_are_labeled_with_the_calling_tool_name() {
        let dialog = vec![
            Message::user("go"),
            Message::assistant(vec![Block::ToolCall {
                id: "c1".to_string(),
                name: "bash".to_string(),
                arguments: json!({"command": "ls"}),
            }]),
            Message::tool_results(vec![Block::ToolResult {
                tool_use_id: "c1".to_string(),
                content: "main.rs".to_string(),
                is_error: false,
            }]),
        ];
        let rendered = printer(20).render(&dialog);
        assert_eq!(rendered, vec!["[bash]\nmain.rs".to_string()]);
    }

    #[test]
    fn errors_and_unknown_ids_get_distinct_labels() {
        let dialog = vec![
            Message::assistant(vec![Block::ToolCall {
                id: "c1".to_string(),
                name: "view_file".to_string(),
                arguments: json!({"path": "x"}),
            }]),
            Message::tool_results(vec![
                Block::ToolResult {
                    tool_use_id: "c1".to_string(),
                    content: "no such file".to_string(),
                    is_error: true,
                },
                Block::ToolResult {
                    tool_use_id: "stray".to_string(),
                    content: "?".to_string(),
                    is_error: false,
                },
            ]),
        ];
        let rendered = printer(20).render(&dialog);
        assert_eq!(rendered[0], "[view_file error]\nno such file");
        assert_eq!(rendered[1], "[unknown tool]\n?");
    }

    #[test]
    fn nothing_is_rendered_without_a_trailing_tool_message() {
        let dialog = vec![Message::user("hi"), Message::assistant(vec![])];
        assert!(printer(20).render(&dialog).is_empty());
    }

    struct NoopGenerator;

    #[async_trait]
    impl Generator for NoopGenerator {
        async fn generate(
            &mut self,
            _dialog: &mut Dialog,
            _config: &GenConfig,
        ) -> Result<StepResponse, LLMError> {
            Err(LLMError::Provider("unused".to_string()))
        }
    }
}
