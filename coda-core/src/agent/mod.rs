//! Agent runtime: the execution loop, the middleware chain, session
//! assembly, and the text-action fallback.

pub mod actions;
pub mod bootstrap;
pub mod executor;
pub mod middleware;

pub use bootstrap::{ResumeTarget, SessionError, SessionOptions, build_session};
pub use executor::{AgentError, AgentExecutor};
