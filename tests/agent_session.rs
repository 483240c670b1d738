//! End-to-end agent loop tests with a scripted generator: a full turn with a
//! tool call persists a chained message tree, and a later session resumes
//! that same chain.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use async_trait::async_trait;
use serde_json::{Value, json};

use coda_core::agent::AgentExecutor;
use coda_core::agent::middleware::{SavingGenerator, ThinkingFilter};
use coda_core::convo::store::MessageStore;
use coda_core::llm::provider::{
    Block, Dialog, GenConfig, Generator, LLMError, Message, Role, StepResponse, ThinkingBudget,
};
use coda_core::tools::{Tool, ToolError, ToolOutput, ToolRegistry};

struct ScriptedGenerator {
    script: Vec<Message>,
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(
        &mut self,
        _dialog: &mut Dialog,
        _config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        if self.script.is_empty() {
            return Err(LLMError::Provider("script exhausted".to_string()));
        }
        Ok(StepResponse {
            candidate: self.script.remove(0),
            usage: None,
        })
    }
}

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn description(&self) -> &'static str {
        "Echoes its input"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {"text": {"type": "string"}}})
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Ok(ToolOutput::ok(format!("echo: {text}")))
    }
}

fn config() -> GenConfig {
    GenConfig {
        model: "scripted".to_string(),
        max_tokens: 100,
        temperature: 0.0,
        top_p: None,
        top_k: None,
        stop_sequences: None,
        frequency_penalty: None,
        presence_penalty: None,
        thinking_budget: ThinkingBudget::None,
    }
}

fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(EchoTool)).expect("register");
    registry
}

fn executor(store: MessageStore, script: Vec<Message>, dialog: Dialog) -> AgentExecutor {
    let inner: Box<dyn Generator> =
        Box::new(ThinkingFilter::new(Box::new(ScriptedGenerator { script })));
    let chain: Box<dyn Generator> = Box::new(SavingGenerator::new(inner, store, "scripted"));
    AgentExecutor::new(chain, registry(), config(), dialog, false)
}

#[tokio::test]
async fn full_turn_persists_a_chained_message_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("messages.jsonl");
    let store = MessageStore::open(&path).expect("open");

    let script = vec![
        Message::assistant(vec![
            Block::text("let me check"),
            Block::ToolCall {
                id: "c1".to_string(),
                name: "echo".to_string(),
                arguments: json!({"text": "ping"}),
            },
        ]),
        Message::assistant(vec![Block::text("the echo said ping")]),
    ];
    let mut executor = executor(store, script, Vec::new());
    let answer = executor.run("try the echo tool").await.expect("run");
    assert_eq!(answer, "the echo said ping");

    let store = MessageStore::open(&path).expect("reopen");
    let leaf = store.latest_leaf().expect("leaf");
    let (dialog, model) = store.dialog_from_leaf(&leaf.id).expect("chain");
    assert_eq!(model, "scripted");
    assert_eq!(dialog.len(), 4);
    assert_eq!(dialog[0].role, Role::User);
    assert_eq!(dialog[1].role, Role::Assistant);
    assert_eq!(dialog[2].role, Role::Tool);
    assert_eq!(dialog[3].role, Role::Assistant);
    assert!(matches!(
        dialog[2].blocks[0],
        Block::ToolResult { ref content, .. } if content == "echo: ping"
    ));
}

#[tokio::test]
async fn a_later_session_continues_the_same_chain() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("messages.jsonl");

    {
        let store = MessageStore::open(&path).expect("open");
        let script = vec![Message::assistant(vec![Block::text("first answer")])];
        let mut executor = executor(store, script, Vec::new());
        executor.run("first question").await.expect("run");
    }

    // Resume from the leaf and add another turn.
    let store = MessageStore::open(&path).expect("reopen");
    let leaf_id = store.latest_leaf().expect("leaf").id.clone();
    let (dialog, _) = store.dialog_from_leaf(&leaf_id).expect("chain");
    assert_eq!(dialog.len(), 2);

    let script = vec![Message::assistant(vec![Block::text("second answer")])];
    let mut executor = executor(store, script, dialog);
    executor.run("second question").await.expect("run");

    let store = MessageStore::open(&path).expect("reopen");
    let leaf = store.latest_leaf().expect("leaf");
    let (dialog, _) = store.dialog_from_leaf(&leaf.id).expect("chain");
    assert_eq!(dialog.len(), 4);
    assert_eq!(dialog[0].text(), "first question");
    assert_eq!(dialog[3].text(), "second answer");

    // one conversation only: the second turn extended the first leaf
    assert_eq!(store.list().len(), 1);
}

#[tokio::test]
async fn provider_failure_leaves_the_user_turn_saved() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("messages.jsonl");
    let store = MessageStore::open(&path).expect("open");

    let mut executor = executor(store, Vec::new(), Vec::new());
    let err = executor.run("doomed question").await.unwrap_err();
    assert!(err.to_string().contains("script exhausted"));

    let store = MessageStore::open(&path).expect("reopen");
    let leaf = store.latest_leaf().expect("leaf");
    assert_eq!(leaf.message.text(), "doomed question");
    assert!(leaf.parent_id.is_none());
}
