//! Folder operation tools.

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

pub struct CreateFolderTool {
    workspace: Arc<Workspace>,
}

impl CreateFolderTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for CreateFolderTool {
    fn name(&self) -> &'static str {
        tools::CREATE_FOLDER
    }

    fn description(&self) -> &'static str {
        "A tool to create a new folder.\n\
         * Will error if the folder already exists\n\
         * Will create parent directories automatically if they don't exist"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path where the folder should be created"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let input: PathInput = parse_args(self.name(), args)?;
        let path = self.workspace.resolve(&input.path);
        if path.exists() {
            return Ok(ToolOutput::error(format!(
                "folder already exists: {}",
                input.path
            )));
        }
        match fs::create_dir_all(&path).await {
            Ok(()) => Ok(ToolOutput::ok(format!("created {}", input.path))),
            Err(e) => Ok(ToolOutput::error(format!(
                "failed to create {}: {e}",
                input.path
            ))),
        }
    }
}

pub struct DeleteFolderTool {
    workspace: Arc<Workspace>,
}

impl DeleteFolderTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for DeleteFolderTool {
    fn name(&self) -> &'static str {
        tools::DELETE_FOLDER
    }

    fn description(&self) -> &'static str {
        "A tool to delete an existing folder.\n\
         * 'recursive' determines whether to delete non-empty folders (defaults to false)\n\
         * Will error if the folder doesn't exist or the path is a file\n\
         * Will error if the folder is not empty and recursive=false"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Relative path to the folder to delete"
                },
                "recursive": {
                    "type": "boolean",
                    "description": "Whether to delete non-empty folders"
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
            recursive: bool,
        }
        let input: Input = parse_args(self.name(), args)?;
        let path = self.workspace.resolve(&input.path);
        if !path.is_dir() {
            return Ok(ToolOutput::error(format!(
                "not a folder: {}",
                input.path
            )));
        }
        let result = if input.recursive {
            fs::remove_dir_all(&path).await
        } else {
            fs::remove_dir(&path).await
        };
        match result {
            Ok(()) => Ok(ToolOutput::ok(format!("deleted {}", input.path))),
            Err(e) => Ok(ToolOutput::error(format!(
                "failed to delete {}: {e}",
                input.path
            ))),
        }
    }
}

pub struct MoveFolderTool {
    workspace: Arc<Workspace>,
}

impl MoveFolderTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for MoveFolderTool {
    fn name(&self) -> &'static str {
        tools::MOVE_FOLDER
    }

    fn description(&self) -> &'static str {
        "A tool to move or rename a folder.\n\
         * Will error if the source folder doesn't exist or if the target already exists\n\
         * Will create parent directories of the target automatically if they don't exist"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "source_path": {
                    "type": "string",
                    "description": "Relative path to the folder to move/rename"
                },
                "target_path": {
                    "type": "string",
                    "description": "Relative path where the folder should be moved/renamed to"
                }
            },
            "required": ["source_path", "target_path"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        #[derive(Deserialize)]
        struct Input {
            source_path: String,
            target_path: String,
        }
        let input: Input = parse_args(self.name(), args)?;
        let source = self.workspace.resolve(&input.source_path);
        let target = self.workspace.resolve(&input.target_path);
        if !source.is_dir() {
            return Ok(ToolOutput::error(format!(
                "source folder does not exist: {}",
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

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(dir: &tempfile::TempDir) -> Arc<Workspace> {
        Arc::new(Workspace::new(dir.path().to_path_buf()))
    }

    #[tokio::test]
    async fn non_empty_folder_needs_recursive() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("full")).expect("mkdir");
        std::fs::write(dir.path().join("full/a.txt"), "x").expect("write");
        let tool = DeleteFolderTool::new(workspace(&dir));

        let out = tool
            .execute(json!({"path": "full"}))
            .await
            .expect("execute");
        assert!(out.is_error);

        let out = tool
            .execute(json!({"path": "full", "recursive": true}))
            .await
            .expect("execute");
        assert!(!out.is_error);
        assert!(!dir.path().join("full").exists());
    }

    #[tokio::test]
    async fn create_rejects_existing_folder() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("sub")).expect("mkdir");
        let tool = CreateFolderTool::new(workspace(&dir));
        let out = tool.execute(json!({"path": "sub"})).await.expect("execute");
        assert!(out.is_error);
    }

    #[tokio::test]
    async fn move_folder_renames() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(dir.path().join("old")).expect("mkdir");
        let tool = MoveFolderTool::new(workspace(&dir));
        let out = tool
            .execute(json!({"source_path": "old", "target_path": "nested/new"}))
            .await
            .expect("execute");
        assert!(!out.is_error);
        assert!(dir.path().join("nested/new").is_dir());
    }
}
