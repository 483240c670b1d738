//! Persistence middleware.
//!
//! Saves the dialog before asking the inner generator for a response (so the
//! user's turn survives a crash mid-request) and again after the candidate
//! arrives. Storage failures are fatal: continuing without persistence would
//! silently lose the conversation.

use async_trait::async_trait;

use crate::convo::store::MessageStore;
use crate::llm::provider::{Dialog, GenConfig, Generator, LLMError, StepResponse};

pub struct SavingGenerator {
    inner: Box<dyn Generator>,
    store: MessageStore,
    model: String,
}

impl SavingGenerator {
    pub fn new(inner: Box<dyn Generator>, store: MessageStore, model: impl Into<String>) -> Self {
        Self {
            inner,
            store,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Generator for SavingGenerator {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        self.store
            .save_dialog(dialog, &self.model)
            .map_err(|e| LLMError::Storage(e.to_string()))?;

        let mut resp = self.inner.generate(dialog, config).await?;

        // Persist the candidate by chaining it onto the dialog, then hand it
        // back with its freshly stamped id. The pop always returns the
        // message pushed just above.
        dialog.push(resp.candidate);
        let save_result = self.store.save_dialog(dialog, &self.model);
        let Some(candidate) = dialog.pop() else {
            return Err(LLMError::Storage(
                "candidate disappeared from the dialog".to_string(),
            ));
        };
        resp.candidate = candidate;
        save_result.map_err(|e| LLMError::Storage(e.to_string()))?;
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convo::MESSAGE_ID_KEY;
    use crate::llm::provider::{Block, Message, ThinkingBudget};

    struct CannedGenerator;

    #[async_trait]
    impl Generator for CannedGenerator {
        async fn generate(
            &mut self,
            _dialog: &mut Dialog,
            _config: &GenConfig,
        ) -> Result<StepResponse, LLMError> {
            Ok(StepResponse {
                candidate: Message::assistant(vec![Block::text("reply")]),
                usage: None,
            })
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn generate(
            &mut self,
            _dialog: &mut Dialog,
            _config: &GenConfig,
        ) -> Result<StepResponse, LLMError> {
            Err(LLMError::Transient("down".to_string()))
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
            thinking_budget: ThinkingBudget::None,
        }
    }

    #[tokio::test]
    async fn saves_user_turn_and_stamped_candidate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("messages.jsonl");
        let store = MessageStore::open(&path).expect("open");
        let mut saving = SavingGenerator::new(Box::new(CannedGenerator), store, "m");

        let mut dialog = vec![Message::user("hello")];
        let resp = saving.generate(&mut dialog, &config()).await.expect("gen");

        assert!(dialog[0].extra.contains_key(MESSAGE_ID_KEY));
        assert!(resp.candidate.extra.contains_key(MESSAGE_ID_KEY));
        // candidate was popped back off the dialog
        assert_eq!(dialog.len(), 1);

        let reopened = MessageStore::open(&path).expect("reopen");
        let leaf = reopened.latest_leaf().expect("leaf");
        assert_eq!(leaf.message.text(), "reply");
    }

    #[tokio::test]
    async fn user_turn_survives_a_failed_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("messages.jsonl");
        let store = MessageStore::open(&path).expect("open");
        let mut saving = SavingGenerator::new(Box::new(FailingGenerator), store, "m");

        let mut dialog = vec![Message::user("hello")];
        let err = saving.generate(&mut dialog, &config()).await.unwrap_err();
        assert!(matches!(err, LLMError::Transient(_)));

        let reopened = MessageStore::open(&path).expect("reopen");
        let leaf = reopened.latest_leaf().expect("leaf");
        assert_eq!(leaf.message.text(), "hello");
    }
}
