//! Text-based action fallback for models (or endpoints) without native tool
//! calling.
//!
//! When tool calling is disabled the model is instructed to emit actions as
//! pseudo-XML elements named after the tools, with a JSON object as the
//! element body:
//!
//! ```text
//! <bash>{"command": "ls"}</bash>
//! ```
//!
//! Results go back to the model as plain text in the next user message, so
//! no tool-call protocol ever reaches the wire.

use serde_json::Value;

use crate::llm::provider::ToolSpec;
use crate::tools::ToolOutput;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAction {
    pub name: String,
    pub arguments: Value,
}

/// Extracts actions from response text, in order of appearance. Only
/// elements named after a known tool are considered; an element whose body
/// is not a JSON object is reported as a parse failure for that action.
pub fn parse_actions(text: &str, specs: &[ToolSpec]) -> Vec<Result<ParsedAction, String>> {
    let mut actions = Vec::new();
    let mut found: Vec<(usize, Result<ParsedAction, String>)> = Vec::new();
    for spec in specs {
        let open = format!("<{}>", spec.name);
        let close = format!("</{}>", spec.name);
        let mut from = 0;
        while let Some(start) = text[from..].find(&open) {
            let start = from + start;
            let body_start = start + open.len();
            let Some(end) = text[body_start..].find(&close) else {
                break;
            };
            let body = text[body_start..body_start + end].trim();
            let parsed = if body.is_empty() {
                Ok(ParsedAction {
                    name: spec.name.clone(),
                    arguments: Value::Object(serde_json::Map::new()),
                })
            } else {
                match serde_json::from_str::<Value>(body) {
                    Ok(arguments @ Value::Object(_)) => Ok(ParsedAction {
                        name: spec.name.clone(),
                        arguments,
                    }),
                    Ok(_) => Err(format!(
                        "action {} body must be a JSON object",
                        spec.name
                    )),
                    Err(e) => Err(format!("action {} has malformed JSON: {e}", spec.name)),
                }
            };
            found.push((start, parsed));
            from = body_start + end + close.len();
        }
    }
    found.sort_by_key(|(pos, _)| *pos);
    actions.extend(found.into_iter().map(|(_, parsed)| parsed));
    actions
}

/// Renders an executed action's output for the follow-up user message.
pub fn render_result(name: &str, output: &ToolOutput) -> String {
    let flag = if output.is_error { " error=\"true\"" } else { "" };
    format!(
        "<tool_result name=\"{name}\"{flag}>\n{}\n</tool_result>",
        output.content
    )
}

/// System prompt addendum teaching the model the action format.
pub fn instructions(specs: &[ToolSpec]) -> String {
    let mut out = String::from(
        "Tool calling is unavailable on this endpoint. To use a tool, emit an \
         element named after the tool with a JSON object body, e.g. \
         <bash>{\"command\": \"ls\"}</bash>. You may emit several actions in \
         one response; their results come back in the next user message as \
         <tool_result> elements. Available tools:\n\n",
    );
    for spec in specs {
        out.push_str(&format!("## {}\n{}\n\nArguments schema:\n{}\n\n", spec.name, spec.description, spec.input_schema));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn specs() -> Vec<ToolSpec> {
        vec![
            ToolSpec {
                name: "bash".to_string(),
                description: "shell".to_string(),
                input_schema: json!({"type": "object"}),
            },
            ToolSpec {
                name: "view_file".to_string(),
                description: "view".to_string(),
                input_schema: json!({"type": "object"}),
            },
        ]
    }

    #[test]
    fn parses_actions_in_document_order() {
        let text = r#"First I'll look around.
<view_file>{"path": "a.rs"}</view_file>
then run it:
<bash>{"command": "cargo run"}</bash>"#;
        let actions = parse_actions(text, &specs());
        assert_eq!(actions.len(), 2);
        let first = actions[0].as_ref().expect("parsed");
        assert_eq!(first.name, "view_file");
        let second = actions[1].as_ref().expect("parsed");
        assert_eq!(second.name, "bash");
        assert_eq!(second.arguments, json!({"command": "cargo run"}));
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let text = "<thinking>hm</thinking> no actions here";
        assert!(parse_actions(text, &specs()).is_empty());
    }

    #[test]
    fn malformed_body_is_a_parse_failure() {
        let text = "<bash>{broken</bash>";
        let actions = parse_actions(text, &specs());
        assert_eq!(actions.len(), 1);
        assert!(actions[0].is_err());
    }

    #[test]
    fn empty_body_means_no_arguments() {
        let text = "<bash></bash>";
        let actions = parse_actions(text, &specs());
        let action = actions[0].as_ref().expect("parsed");
        assert_eq!(action.arguments, json!({}));
    }

    #[test]
    fn result_rendering_marks_errors() {
        let out = render_result("bash", &ToolOutput::error("boom"));
        assert!(out.contains("error=\"true\""));
        assert!(out.contains("boom"));
    }
}
