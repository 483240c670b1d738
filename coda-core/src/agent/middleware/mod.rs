//! Generator middlewares.
//!
//! Each middleware wraps an inner [`Generator`] and is itself one, so the
//! chain composes freely. Assembly order matters: the thinking filter must
//! sit directly on the vendor adapter (it hands the adapter a filtered
//! clone), and the saving layer goes outermost so everything the inner
//! layers see is already persisted.
//!
//! [`Generator`]: crate::llm::provider::Generator

pub mod response_printer;
pub mod saving;
pub mod thinking_filter;
pub mod token_usage;
pub mod tool_printer;

pub use response_printer::ResponsePrinter;
pub use saving::SavingGenerator;
pub use thinking_filter::ThinkingFilter;
pub use token_usage::TokenUsageGenerator;
pub use tool_printer::ToolResultPrinter;
