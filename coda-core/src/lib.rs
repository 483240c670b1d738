//! Core library for coda, a terminal coding agent.
//!
//! The pieces, bottom up:
//! - [`llm`]: the provider-neutral dialog model, the [`Generator`] contract,
//!   and adapters for Anthropic, OpenAI, Gemini, DeepSeek, and any
//!   OpenAI-compatible endpoint.
//! - [`tools`]: the registry the model's tool calls dispatch into.
//! - [`convo`]: JSONL persistence; conversations are message trees and a
//!   conversation id is the id of its leaf message.
//! - [`agent`]: the execution loop and the middleware chain that wires
//!   persistence, printing, and accounting around a vendor adapter.
//!
//! [`Generator`]: llm::provider::Generator

pub mod agent;
pub mod config;
pub mod convo;
pub mod llm;
pub mod prompts;
pub mod tools;
