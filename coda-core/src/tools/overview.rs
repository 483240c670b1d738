//! Codebase overview tools: a recursive text-file survey and a related-file
//! finder driven by filename-stem matching.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use walkdir::WalkDir;

use crate::config::constants::tools;

use super::registry::{Tool, ToolError, ToolOutput, parse_args};
use super::Workspace;

const SKIPPED_DIRS: &[&str] = &[".git", "target", "node_modules"];

fn is_skipped(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.depth() > 0 && name.starts_with('.') {
        return true;
    }
    entry.file_type().is_dir() && SKIPPED_DIRS.contains(&name.as_ref())
}

/// Collects (relative path, content) for every UTF-8 text file under `root`,
/// sorted by path. Binary files and skipped directories are left out.
fn collect_text_files(root: &Path) -> Vec<(PathBuf, String)> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        let Ok(content) = String::from_utf8(bytes) else {
            continue;
        };
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        files.push((relative, content));
    }
    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

pub struct FilesOverviewTool {
    workspace: Arc<Workspace>,
}

impl FilesOverviewTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for FilesOverviewTool {
    fn name(&self) -> &'static str {
        tools::FILES_OVERVIEW
    }

    fn description(&self) -> &'static str {
        "A tool to get an overview of all files found recursively in the current directory or a subfolder.\n\
         * Each text file is listed with its relative path and line count\n\
         * Hidden files, VCS metadata, and build output are skipped\n\
         * Use this tool to get an understanding of a codebase and to select input files for 'get_related_files'"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Optional path to the folder to overview. Defaults to the current directory."
                }
            }
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        #[derive(Deserialize)]
        struct Input {
            #[serde(default)]
            path: Option<String>,
        }
        let input: Input = parse_args(self.name(), args)?;
        let root = match &input.path {
            Some(path) if !path.is_empty() => self.workspace.resolve(path),
            _ => self.workspace.cwd(),
        };
        if root.is_file() {
            return Ok(ToolOutput::error(format!(
                "{} is a file, not a directory; use view_file instead",
                root.display()
            )));
        }
        if !root.is_dir() {
            return Ok(ToolOutput::error(format!(
                "path does not exist: {}",
                root.display()
            )));
        }

        let files = collect_text_files(&root);
        if files.is_empty() {
            return Ok(ToolOutput::ok("no text files found"));
        }
        let mut out = String::new();
        for (path, content) in &files {
            out.push_str(&format!(
                "{} ({} lines)\n",
                path.display(),
                content.lines().count()
            ));
        }
        Ok(ToolOutput::ok(out))
    }
}

pub struct GetRelatedFilesTool {
    workspace: Arc<Workspace>,
}

impl GetRelatedFilesTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GetRelatedFilesTool {
    fn name(&self) -> &'static str {
        tools::GET_RELATED_FILES
    }

    fn description(&self) -> &'static str {
        "A tool to retrieve the full contents of a set of input files plus files related to them.\n\
         * A file is related when it mentions an input file's name stem\n\
         * Call this after 'files_overview', before modifying a codebase\n\
         * Returns each file's relative path followed by its complete contents"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "input_files": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Files to retrieve, e.g. the files you are about to modify."
                }
            },
            "required": ["input_files"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        #[derive(Deserialize)]
        struct Input {
            input_files: Vec<String>,
        }
        let input: Input = parse_args(self.name(), args)?;
        if input.input_files.is_empty() {
            return Err(ToolError::InvalidArguments {
                tool: self.name().to_string(),
                message: "input_files is required and must not be empty".to_string(),
            });
        }

        let missing: Vec<&str> = input
            .input_files
            .iter()
            .filter(|f| !self.workspace.resolve(f).is_file())
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Ok(ToolOutput::error(format!(
                "the following input files do not exist or are not accessible: {}",
                missing.join(", ")
            )));
        }

        let stems: Vec<String> = input
            .input_files
            .iter()
            .filter_map(|f| {
                Path::new(f)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .collect();

        let root = self.workspace.cwd();
        let inputs: Vec<PathBuf> = input.input_files.iter().map(PathBuf::from).collect();
        let mut selected = Vec::new();
        for (path, content) in collect_text_files(&root) {
            let is_input = inputs.iter().any(|i| *i == path);
            let mentions_input = stems
                .iter()
                .any(|stem| !stem.is_empty() && content.contains(stem.as_str()));
            if is_input || mentions_input {
                selected.push((path, content));
            }
        }

        let mut out = String::new();
        for (path, content) in &selected {
            out.push_str(&format!(
                "File: {}\nContent:\n```\n{}\n```\n\n",
                path.display(),
                content
            ));
        }
        Ok(ToolOutput::ok(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workspace(dir: &tempfile::TempDir) -> Arc<Workspace> {
        Arc::new(Workspace::new(dir.path().to_path_buf()))
    }

    #[tokio::test]
    async fn overview_lists_text_files_and_skips_hidden() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").expect("write");
        std::fs::create_dir(dir.path().join(".git")).expect("mkdir");
        std::fs::write(dir.path().join(".git/config"), "x").expect("write");
        std::fs::write(dir.path().join("blob.bin"), [0u8, 255, 254]).expect("write");

        let tool = FilesOverviewTool::new(workspace(&dir));
        let out = tool.execute(json!({})).await.expect("execute");
        assert!(!out.is_error);
        assert!(out.content.contains("a.rs (1 lines)"));
        assert!(!out.content.contains(".git"));
        assert!(!out.content.contains("blob.bin"));
    }

    #[tokio::test]
    async fn overview_rejects_file_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.txt"), "x").expect("write");
        let tool = FilesOverviewTool::new(workspace(&dir));
        let out = tool
            .execute(json!({"path": "a.txt"}))
            .await
            .expect("execute");
        assert!(out.is_error);
        assert!(out.content.contains("view_file"));
    }

    #[tokio::test]
    async fn related_files_include_inputs_and_mentions() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("parser.rs"), "pub fn parse() {}\n").expect("write");
        std::fs::write(dir.path().join("caller.rs"), "use parser;\n").expect("write");
        std::fs::write(dir.path().join("unrelated.rs"), "fn other() {}\n").expect("write");

        let tool = GetRelatedFilesTool::new(workspace(&dir));
        let out = tool
            .execute(json!({"input_files": ["parser.rs"]}))
            .await
            .expect("execute");
        assert!(!out.is_error);
        assert!(out.content.contains("File: parser.rs"));
        assert!(out.content.contains("File: caller.rs"));
        assert!(!out.content.contains("unrelated.rs"));
    }

    #[tokio::test]
    async fn related_files_reports_missing_inputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = GetRelatedFilesTool::new(workspace(&dir));
        let out = tool
            .execute(json!({"input_files": ["ghost.rs"]}))
            .await
            .expect("execute");
        assert!(out.is_error);
        assert!(out.content.contains("ghost.rs"));
    }

    #[tokio::test]
    async fn empty_input_list_is_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tool = GetRelatedFilesTool::new(workspace(&dir));
        let err = tool
            .execute(json!({"input_files": []}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { .. }));
    }
}
