//! System prompt assembly.

use std::path::Path;

const AGENT_INSTRUCTIONS: &str = r#"You are coda, an expert coding assistant operating inside the user's project directory.

Working style:
- Before modifying a codebase, build an understanding of it. Start with the files_overview tool, then pull the full contents of the files you plan to touch (and their neighbors) with get_related_files.
- Prefer the dedicated file tools (create_file, edit_file, move_file, ...) over shell redirection for file changes; edits are checked for uniqueness so you cannot clobber unrelated text.
- Use the bash tool for builds, tests, searches, and anything else a shell does well. Avoid commands that produce enormous output.
- When you edit a file, re-check your work: view the file or run the project's tests.
- Keep responses focused. When the task is complete, summarize what changed and stop; do not pad the answer.
- If a tool reports an error, read it carefully and adjust. Do not retry the identical call.

You cannot ask the user questions mid-task. Make reasonable decisions and note them in your final answer."#;

/// Builds the system prompt: fixed instructions plus the runtime context the
/// model needs to ground relative paths.
pub fn system_prompt(cwd: &Path) -> String {
    format!(
        "{AGENT_INSTRUCTIONS}\n\nCurrent working directory: {}\nOperating system: {}",
        cwd.display(),
        std::env::consts::OS
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_the_working_directory() {
        let prompt = system_prompt(Path::new("/tmp/project"));
        assert!(prompt.contains("/tmp/project"));
        assert!(prompt.contains(std::env::consts::OS));
    }
}
