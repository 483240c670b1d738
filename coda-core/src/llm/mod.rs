//! Provider-neutral LLM layer: the dialog model, the [`Generator`] contract,
//! vendor adapters, and the shared retry/truncation policies.
//!
//! [`Generator`]: provider::Generator

pub mod factory;
pub mod provider;
pub mod providers;
pub mod retry;
pub mod truncate;

pub use factory::build_provider;
pub use provider::{
    Block, Dialog, GenConfig, Generator, LLMError, Message, Role, StepResponse, ThinkingBudget,
    TokenUsage, ToolSpec, validate_dialog,
};
