//! The agent's tool surface: shell access, file and folder operations, and
//! codebase overview helpers, all dispatched through [`ToolRegistry`].

pub mod bash;
pub mod file_ops;
pub mod folder_ops;
pub mod overview;
pub mod registry;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub use registry::{Tool, ToolError, ToolOutput, ToolRegistry};

/// Shared working-directory state. The `change_directory` tool moves it and
/// every other tool resolves relative paths against it.
pub struct Workspace {
    cwd: Mutex<PathBuf>,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Self {
            cwd: Mutex::new(root),
        }
    }

    pub fn cwd(&self) -> PathBuf {
        self.cwd
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_cwd(&self, path: PathBuf) {
        *self
            .cwd
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = path;
    }

    /// Joins a possibly-relative path onto the current working directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd().join(path)
        }
    }
}

/// Builds the full tool set the agent ships with.
pub fn default_registry(workspace: Arc<Workspace>) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(bash::BashTool::new(workspace.clone())))?;
    registry.register(Box::new(file_ops::CreateFileTool::new(workspace.clone())))?;
    registry.register(Box::new(file_ops::EditFileTool::new(workspace.clone())))?;
    registry.register(Box::new(file_ops::DeleteFileTool::new(workspace.clone())))?;
    registry.register(Box::new(file_ops::MoveFileTool::new(workspace.clone())))?;
    registry.register(Box::new(file_ops::ViewFileTool::new(workspace.clone())))?;
    registry.register(Box::new(file_ops::ChangeDirectoryTool::new(
        workspace.clone(),
    )))?;
    registry.register(Box::new(folder_ops::CreateFolderTool::new(
        workspace.clone(),
    )))?;
    registry.register(Box::new(folder_ops::DeleteFolderTool::new(
        workspace.clone(),
    )))?;
    registry.register(Box::new(folder_ops::MoveFolderTool::new(workspace.clone())))?;
    registry.register(Box::new(overview::FilesOverviewTool::new(
        workspace.clone(),
    )))?;
    registry.register(Box::new(overview::GetRelatedFilesTool::new(workspace)))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::constants::tools;

    #[test]
    fn default_registry_exposes_every_tool() {
        let workspace = Arc::new(Workspace::new(PathBuf::from(".")));
        let registry = default_registry(workspace).expect("registry");
        for name in [
            tools::BASH,
            tools::CREATE_FILE,
            tools::EDIT_FILE,
            tools::DELETE_FILE,
            tools::MOVE_FILE,
            tools::VIEW_FILE,
            tools::CHANGE_DIRECTORY,
            tools::CREATE_FOLDER,
            tools::DELETE_FOLDER,
            tools::MOVE_FOLDER,
            tools::FILES_OVERVIEW,
            tools::GET_RELATED_FILES,
        ] {
            assert!(registry.has_tool(name), "missing tool {name}");
        }
        assert_eq!(registry.specs().len(), 12);
    }

    #[test]
    fn workspace_resolves_relative_paths() {
        let workspace = Workspace::new(PathBuf::from("/tmp/project"));
        assert_eq!(
            workspace.resolve("src/main.rs"),
            PathBuf::from("/tmp/project/src/main.rs")
        );
        assert_eq!(workspace.resolve("/etc/hosts"), PathBuf::from("/etc/hosts"));
    }
}
