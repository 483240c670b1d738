//! Prints each assistant response as it arrives, so intermediate text is
//! visible while the agent keeps working through tool calls.

use async_trait::async_trait;

use crate::llm::provider::{Block, Dialog, GenConfig, Generator, LLMError, StepResponse};

pub struct ResponsePrinter {
    inner: Box<dyn Generator>,
}

impl ResponsePrinter {
    pub fn new(inner: Box<dyn Generator>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Generator for ResponsePrinter {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        let resp = self.inner.generate(dialog, config).await?;
        for block in &resp.candidate.blocks {
            match block {
                Block::Text { text } if !text.is_empty() => println!("{text}"),
                Block::ToolCall { name, .. } => println!("[calling {name}]"),
                _ => {}
            }
        }
        Ok(resp)
    }
}
