//! Shell execution tool.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::process::Command;

use crate::config::constants::{defaults, tools};

use super::registry::{Tool, ToolError, ToolOutput, parse_args};
use super::Workspace;

pub struct BashTool {
    workspace: Arc<Workspace>,
    timeout: Duration,
}

#[derive(Deserialize)]
struct BashInput {
    command: String,
}

impl BashTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            workspace,
            timeout: Duration::from_secs(defaults::BASH_TIMEOUT_SECS),
        }
    }

    #[cfg(test)]
    fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &'static str {
        tools::BASH
    }

    fn description(&self) -> &'static str {
        "Run commands in a bash shell\n\
         * The contents of the \"command\" parameter do NOT need to be escaped.\n\
         * Commands run in the agent's current working directory.\n\
         * Environment variables are not persisted between calls.\n\
         * Avoid commands that may produce a very large amount of output.\n\
         * Run long lived commands in the background, e.g. 'sleep 10 &'"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The bash command to run."
                }
            },
            "required": ["command"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: BashInput = parse_args(self.name(), args)?;
        if input.command.is_empty() {
            return Err(ToolError::InvalidArguments {
                tool: self.name().to_string(),
                message: "command is required".to_string(),
            });
        }

        let result = tokio::time::timeout(
            self.timeout,
            Command::new("bash")
                .arg("-c")
                .arg(&input.command)
                .current_dir(self.workspace.cwd())
                .output(),
        )
        .await;

        let output = match result {
            Err(_) => {
                return Ok(ToolOutput::error(format!(
                    "command timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
            Ok(Err(e)) => {
                return Ok(ToolOutput::error(format!("failed to start bash: {e}")));
            }
            Ok(Ok(output)) => output,
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if output.status.success() {
            Ok(ToolOutput::ok(combined))
        } else {
            let code = output.status.code().unwrap_or(1);
            Ok(ToolOutput::error(format!(
                "command failed with exit code {code}; output:\n{combined}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tool() -> BashTool {
        BashTool::new(Arc::new(Workspace::new(PathBuf::from("."))))
    }

    #[tokio::test]
    async fn successful_command_returns_output() {
        let out = tool()
            .execute(json!({"command": "echo hello"}))
            .await
            .expect("execute");
        assert!(!out.is_error);
        assert_eq!(out.content.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_an_error_result() {
        let out = tool()
            .execute(json!({"command": "echo oops >&2; exit 3"}))
            .await
            .expect("execute");
        assert!(out.is_error);
        assert!(out.content.contains("exit code 3"));
        assert!(out.content.contains("oops"));
    }

    #[tokio::test]
    async fn timeout_is_an_error_result() {
        let out = tool()
            .with_timeout(Duration::from_millis(50))
            .execute(json!({"command": "sleep 5"}))
            .await
            .expect("execute");
        assert!(out.is_error);
        assert!(out.content.contains("timed out"));
    }

    #[tokio::test]
    async fn empty_command_is_invalid() {
        let err = tool().execute(json!({"command": ""})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn runs_in_the_workspace_cwd() {
        let dir = tempfile::tempdir().expect("tempdir");
        let workspace = Arc::new(Workspace::new(dir.path().to_path_buf()));
        let out = BashTool::new(workspace)
            .execute(json!({"command": "pwd"}))
            .await
            .expect("execute");
        assert!(out.content.trim().ends_with(
            dir.path()
                .file_name()
                .and_then(|n| n.to_str())
                .expect("dir name")
        ));
    }
}
