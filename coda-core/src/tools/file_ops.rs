//! File operation tools: create, edit, delete, move, view, and the working
//! directory switch.
//!
//! Failures a model can recover from (missing files, non-unique edit
//! targets) come back as error-flagged results, not hard errors.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::fs;

use crate::config::constants::tools;

use super::registry::{Tool, ToolError, ToolOutput, parse_args};
use super::Workspace;

#[derive(Deserialize)]
struct PathInput {
    path: String,
}

#[derive(Deserialize)]
struct MoveInput {
    source_path: String,
    target_path: String,
}

fn path_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {"type": "string", "description": description}
        },
        "required": ["path"]
    })
}

fn move_schema(what: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "source_path": {
                "type": "string",
                "description": format!("Relative path to the {what} to move/rename")
            },
            "target_path": {
                "type": "string",
                "description": format!("Relative path where the {what} should be moved/renamed to")
            }
        },
        "required": ["source_path", "target_path"]
    })
}

pub struct CreateFileTool {
    workspace: Arc<Workspace>,
}

impl CreateFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &'static str {
        tools::CREATE_FILE
    }

    fn description(&self) -> &'static str {
        "A tool to create a new file in the current folder or its subfolders.\n\
         * 'path' must specify where to create the file (can include subdirectories)\n\
         * 'file_text' must be supplied as the contents of the new file\n\
         * Will error if the file already exists\n\
         * Will create parent directories automatically if they don't exist"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path where the file should be created"
                },
                "file_text": {
                    "type": "string",
                    "description": "Content to write to the new file"
                }
            },
            "required": ["path", "file_text"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        #[derive(Deserialize)]
        struct Input {
            path: String,
            file_text: String,
        }
        let input: Input = parse_args(self.name(), args)?;
        let path = self.workspace.resolve(&input.path);
        if path.exists() {
            return Ok(ToolOutput::error(format!(
                "file already exists: {}",
                input.path
            )));
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return Ok(ToolOutput::error(format!(
                    "failed to create parent directories for {}: {e}",
                    input.path
                )));
            }
        }
        match fs::write(&path, &input.file_text).await {
            Ok(()) => Ok(ToolOutput::ok(format!("created {}", input.path))),
            Err(e) => Ok(ToolOutput::error(format!(
                "failed to create {}: {e}",
                input.path
            ))),
        }
    }
}

pub struct EditFileTool {
    workspace: Arc<Workspace>,
}

impl EditFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &'static str {
        tools::EDIT_FILE
    }

    fn description(&self) -> &'static str {
        "A tool to edit, delete, or append content to an existing file.\n\
         * 'path' must specify the file to edit\n\
         * If both 'old_str' and 'new_str' are provided, replaces the unique occurrence of 'old_str' with 'new_str'.\n\
         * If only 'old_str' is provided, deletes the unique occurrence of 'old_str'.\n\
         * If only 'new_str' is provided, appends 'new_str' to the end of the file.\n\
         * For edit or delete, 'old_str' must match exactly one occurrence (including whitespace).\n\
         * Errors if the file does not exist or match count conditions are not met."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path to the file to edit"
                },
                "old_str": {
                    "type": "string",
                    "description": "The exact text to replace or delete (must be unique if provided)"
                },
                "new_str": {
                    "type": "string",
                    "description": "The replacement text, or text to append when old_str is absent"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        #[derive(Deserialize)]
        struct Input {
            path: String,
            #[serde(default)]
            old_str: Option<String>,
            #[serde(default)]
            new_str: Option<String>,
        }
        let input: Input = parse_args(self.name(), args)?;
        let path = self.workspace.resolve(&input.path);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to read {}: {e}",
                    input.path
                )));
            }
        };

        let old = input.old_str.filter(|s| !s.is_empty());
        let new = input.new_str.filter(|s| !s.is_empty());
        let updated = match (old, new) {
            (None, None) => {
                return Ok(ToolOutput::error(
                    "either old_str or new_str must be provided",
                ));
            }
            (None, Some(new)) => {
                let mut updated = content;
                updated.push_str(&new);
                updated
            }
            (Some(old), new) => {
                let count = content.matches(&old).count();
                if count != 1 {
                    return Ok(ToolOutput::error(format!(
                        "old_str must match exactly one occurrence in {}, found {count}",
                        input.path
                    )));
                }
                content.replacen(&old, new.as_deref().unwrap_or(""), 1)
            }
        };

        match fs::write(&path, updated).await {
            Ok(()) => Ok(ToolOutput::ok(format!("edited {}", input.path))),
            Err(e) => Ok(ToolOutput::error(format!(
                "failed to write {}: {e}",
                input.path
            ))),
        }
    }
}

pub struct DeleteFileTool {
    workspace: Arc<Workspace>,
}

impl DeleteFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &'static str {
        tools::DELETE_FILE
    }

    fn description(&self) -> &'static str {
        "A tool to delete an existing file.\n\
         * Will error if the file doesn't exist\n\
         * Will error if the path is a directory instead of a file"
    }

    fn input_schema(&self) -> Value {
        path_schema("Relative path to the file to delete")
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: PathInput = parse_args(self.name(), args)?;
        let path = self.workspace.resolve(&input.path);
        if path.is_dir() {
            return Ok(ToolOutput::error(format!(
                "{} is a directory, use delete_folder instead",
                input.path
            )));
        }
        match fs::remove_file(&path).await {
            Ok(()) => Ok(ToolOutput::ok(format!("deleted {}", input.path))),
            Err(e) => Ok(ToolOutput::error(format!(
                "failed to delete {}: {e}",
                input.path
            ))),
        }
    }
}

pub struct MoveFileTool {
    workspace: Arc<Workspace>,
}

impl MoveFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for MoveFileTool {
    fn name(&self) -> &'static str {
        tools::MOVE_FILE
    }

    fn description(&self) -> &'static str {
        "A tool to move or rename a file.\n\
         * Will error if the source file doesn't exist or if the target file already exists\n\
         * Will create parent directories of the target automatically if they don't exist"
    }

    fn input_schema(&self) -> Value {
        move_schema("file")
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: MoveInput = parse_args(self.name(), args)?;
        let source = self.workspace.resolve(&input.source_path);
        let target = self.workspace.resolve(&input.target_path);
        if !source.is_file() {
            return Ok(ToolOutput::error(format!(
                "source file does not exist: {}",
                input.source_path
            )));
        }
        if target.exists() {
            return Ok(ToolOutput::error(format!(
                "target already exists: {}",
                input.target_path
            )));
        }
        if let Some(parent) = target.parent() {
            if let Err(e) = fs::create_dir_all(parent).await {
                return Ok(ToolOutput::error(format!(
                    "failed to create parent directories for {}: {e}",
                    input.target_path
                )));
            }
        }
        match fs::rename(&source, &target).await {
            Ok(()) => Ok(ToolOutput::ok(format!(
                "moved {} to {}",
                input.source_path, input.target_path
            ))),
            Err(e) => Ok(ToolOutput::error(format!(
                "failed to move {}: {e}",
                input.source_path
            ))),
        }
    }
}

pub struct ViewFileTool {
    workspace: Arc<Workspace>,
}

impl ViewFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ViewFileTool {
    fn name(&self) -> &'static str {
        tools::VIEW_FILE
    }

    fn description(&self) -> &'static str {
        "A tool to view the full contents of a file.\n\
         * Will error if the file doesn't exist or if the path points to a directory\n\
         * Will error if the file is binary (non-text)\n\
         * Returns the complete contents of the file as a string"
    }

    fn input_schema(&self) -> Value {
        path_schema("Relative path to the file to view")
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: PathInput = parse_args(self.name(), args)?;
        let path = self.workspace.resolve(&input.path);
        if path.is_dir() {
            return Ok(ToolOutput::error(format!(
                "{} is a directory, not a file",
                input.path
            )));
        }
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to read {}: {e}",
                    input.path
                )));
            }
        };
        match String::from_utf8(bytes) {
            Ok(content) => Ok(ToolOutput::ok(content)),
            Err(_) => Ok(ToolOutput::error(format!(
                "{} is not a text file",
                input.path
            ))),
        }
    }
}

pub struct ChangeDirectoryTool {
    workspace: Arc<Workspace>,
}

impl ChangeDirectoryTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ChangeDirectoryTool {
    fn name(&self) -> &'static str {
        tools::CHANGE_DIRECTORY
    }

    fn description(&self) -> &'static str {
        "A tool to change the agent's working directory.\n\
         * Affects where subsequent tools resolve relative paths and where bash commands run\n\
         * Will error if the path doesn't exist or is not a directory"
    }

    fn input_schema(&self) -> Value {
        path_schema("Path to the directory to switch to")
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: PathInput = parse_args(self.name(), args)?;
        let path = self.workspace.resolve(&input.path);
        if !path.is_dir() {
            return Ok(ToolOutput::error(format!(
                "not a directory: {}",
                input.path
            )));
        }
        let canonical = match fs::canonicalize(&path).await {
            Ok(canonical) => canonical,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to resolve {}: {e}",
                    input.path
                )));
            }
        };
        self.workspace.set_cwd(canonical.clone());
        Ok(ToolOutput::ok(format!(
            "working directory is now {}",
            canonical.display()
        )))
    }
}
