//! Central constants to avoid hardcoding values throughout the codebase.

/// Provider family identifiers.
pub mod providers {
    pub const ANTHROPIC: &str = "anthropic";
    pub const OPENAI: &str = "openai";
    pub const GEMINI: &str = "gemini";
    pub const DEEPSEEK: &str = "deepseek";
    pub const OPENAI_COMPAT: &str = "openai-compat";
}

/// API endpoints and protocol versions.
pub mod urls {
    pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
    pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
    pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1";
}

/// Environment variables consumed at startup.
pub mod env {
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";

    /// Global custom-endpoint override.
    pub const CUSTOM_URL: &str = "CODA_CUSTOM_URL";
    /// Per-model override: `CODA_<MODEL>_URL` with the model name uppercased
    /// and `-`/`.` replaced by `_`.
    pub const MODEL_URL_PREFIX: &str = "CODA_";
    pub const MODEL_URL_SUFFIX: &str = "_URL";
    /// Forces the pseudo-XML action fallback instead of native tool calling,
    /// for custom models that do not support structured tool use.
    pub const DISABLE_TOOLS: &str = "CODA_DISABLE_TOOLS";
}

/// Shared policy defaults. One consistent set for every adapter.
pub mod defaults {
    pub const MAX_RETRIES: u32 = 5;
    pub const RETRY_BACKOFF_SECS: u64 = 60;
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;
    pub const MAX_TOOL_RESULT_TOKENS: usize = 50_000;
    pub const BASH_TIMEOUT_SECS: u64 = 300;
    /// Lines of a tool result shown by the tool-result printer.
    pub const TOOL_PRINT_MAX_LINES: usize = 20;
    pub const DEFAULT_MAX_TOKENS: u32 = 8192;
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;
    /// Workspace-relative path of the message store.
    pub const STORE_FILE: &str = ".coda/messages.jsonl";
}

/// Tool name constants. These are the external contract declared to models.
pub mod tools {
    pub const BASH: &str = "bash";
    pub const CREATE_FILE: &str = "create_file";
    pub const EDIT_FILE: &str = "edit_file";
    pub const DELETE_FILE: &str = "delete_file";
    pub const MOVE_FILE: &str = "move_file";
    pub const VIEW_FILE: &str = "view_file";
    pub const CREATE_FOLDER: &str = "create_folder";
    pub const DELETE_FOLDER: &str = "delete_folder";
    pub const MOVE_FOLDER: &str = "move_folder";
    pub const CHANGE_DIRECTORY: &str = "change_directory";
    pub const FILES_OVERVIEW: &str = "files_overview";
    pub const GET_RELATED_FILES: &str = "get_related_files";
}

/// Token budgets for vendor thinking/reasoning knobs that take an absolute
/// number rather than an effort level.
pub mod thinking {
    pub const LOW_BUDGET_TOKENS: u32 = 2048;
    pub const MEDIUM_BUDGET_TOKENS: u32 = 8192;
    pub const HIGH_BUDGET_TOKENS: u32 = 24_576;
}
