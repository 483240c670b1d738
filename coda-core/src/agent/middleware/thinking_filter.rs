//! Strips thinking blocks from the dialog handed to the inner generator.
//!
//! Providers reject (or bill for) replayed reasoning traces from earlier
//! turns, so the adapter gets a filtered clone. The caller's dialog is never
//! touched, and the fresh response keeps its thinking blocks so they still
//! reach the persistence layer above.

use async_trait::async_trait;

use crate::llm::provider::{Dialog, GenConfig, Generator, LLMError, Role, StepResponse};

pub struct ThinkingFilter {
    inner: Box<dyn Generator>,
}

impl ThinkingFilter {
    pub fn new(inner: Box<dyn Generator>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Generator for ThinkingFilter {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        let mut filtered: Dialog = dialog.clone();
        for message in filtered.iter_mut() {
            if message.role == Role::Assistant {
                message.blocks.retain(|block| !block.is_thinking());
            }
        }
        filtered.retain(|message| !message.blocks.is_empty());
        self.inner.generate(&mut filtered, config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{Block, Message};

    use std::sync::{Arc, Mutex};

    struct CapturingGenerator {
        seen: Arc<Mutex<Vec<Dialog>>>,
    }

    #[async_trait]
    impl Generator for CapturingGenerator {
        async fn generate(
            &mut self,
            dialog: &mut Dialog,
            _config: &GenConfig,
        ) -> Result<StepResponse, LLMError> {
            self.seen.lock().expect("lock").push(dialog.clone());
            Ok(StepResponse {
                candidate: Message::assistant(vec![Block::Thinking {
                    text: "new thought".to_string(),
                    signature: None,
                    provider: None,
                }]),
                usage: None,
            })
        }
    }

    fn config() -> GenConfig {
        GenConfig {
            model: "m".to_string(),
            max_tokens: 100,
            temperature: 0.0,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            frequency_penalty: None,
            presence_penalty: None,
            thinking_budget: crate::llm::provider::ThinkingBudget::None,
        }
    }

    #[tokio::test]
    async fn inner_sees_no_thinking_and_caller_keeps_it() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut dialog = vec![
            Message::user("q"),
            Message::assistant(vec![
                Block::Thinking {
                    text: "old thought".to_string(),
                    signature: None,
                    provider: None,
                },
                Block::text("a"),
            ]),
            Message::user("followup"),
        ];
        let mut filter = ThinkingFilter::new(Box::new(CapturingGenerator { seen: seen.clone() }));
        let resp = filter.generate(&mut dialog, &config()).await.expect("gen");

        // caller's dialog untouched
        assert!(dialog[1].blocks.iter().any(Block::is_thinking));
        // the inner generator never saw the old thinking
        let captured = seen.lock().expect("lock");
        assert!(
            captured[0]
                .iter()
                .all(|m| m.blocks.iter().all(|b| !b.is_thinking()))
        );
        // the fresh response keeps its thinking
        assert!(resp.candidate.blocks.iter().any(Block::is_thinking));
    }

    #[tokio::test]
    async fn thinking_only_messages_are_dropped_from_the_clone() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut filter = ThinkingFilter::new(Box::new(CapturingGenerator { seen: seen.clone() }));
        let mut dialog = vec![
            Message::user("q"),
            Message::assistant(vec![Block::Thinking {
                text: "only thought".to_string(),
                signature: None,
                provider: None,
            }]),
            Message::user("again"),
        ];
        filter.generate(&mut dialog, &config()).await.expect("gen");
        assert_eq!(dialog.len(), 3);
        assert_eq!(seen.lock().expect("lock")[0].len(), 2);
    }
}
