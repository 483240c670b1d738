//! Token accounting middleware. Prints per-request usage to stderr and keeps
//! a running total for the session.

use async_trait::async_trait;

use crate::llm::provider::{Dialog, GenConfig, Generator, LLMError, StepResponse, TokenUsage};

pub struct TokenUsageGenerator {
    inner: Box<dyn Generator>,
    total: TokenUsage,
    quiet: bool,
}

impl TokenUsageGenerator {
    pub fn new(inner: Box<dyn Generator>) -> Self {
        Self {
            inner,
            total: TokenUsage::default(),
            quiet: false,
        }
    }

    #[cfg(test)]
    fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    pub fn total(&self) -> &TokenUsage {
        &self.total
    }

    fn accumulate(&mut self, usage: &TokenUsage) {
        self.total.input_tokens += usage.input_tokens;
        self.total.output_tokens += usage.output_tokens;
        if let Some(read) = usage.cache_read_tokens {
            self.total.cache_read_tokens =
                Some(self.total.cache_read_tokens.unwrap_or(0) + read);
        }
        if let Some(write) = usage.cache_write_tokens {
            self.total.cache_write_tokens =
                Some(self.total.cache_write_tokens.unwrap_or(0) + write);
        }
    }

    fn report(&self, usage: &TokenUsage) {
        if self.quiet {
            return;
        }
        let mut line = format!(
            "tokens: {} in / {} out",
            usage.input_tokens, usage.output_tokens
        );
        if let Some(read) = usage.cache_read_tokens {
            line.push_str(&format!(" ({read} cached)"));
        }
        eprintln!("{line}");
    }
}

#[async_trait]
impl Generator for TokenUsageGenerator {
    async fn generate(
        &mut self,
        dialog: &mut Dialog,
        config: &GenConfig,
    ) -> Result<StepResponse, LLMError> {
        let resp = self.inner.generate(dialog, config).await?;
        if let Some(usage) = &resp.usage {
            self.accumulate(usage);
            self.report(usage);
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::{Block, Message, ThinkingBudget};

    struct UsageGenerator;

    #[async_trait]
    impl Generator for UsageGenerator {
        async fn generate(
            &mut self,
            _dialog: &mut Dialog,
            _config: &GenConfig,
        ) -> Result<StepResponse, LLMError> {
            Ok(StepResponse {
                candidate: Message::assistant(vec![Block::text("x")]),
                usage: Some(TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5,
                    cache_read_tokens: Some(3),
                    cache_write_tokens: None,
                }),
            })
        }
    }

    #[tokio::test]
    async fn totals_accumulate_across_requests() {
        let mut counter = TokenUsageGenerator::new(Box::new(UsageGenerator)).quiet();
        let mut dialog = vec![Message::user("q")];
        let config = GenConfig {
            model: "m".to_string(),
            max_tokens: 100,
            temperature: 0.0,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            frequency_penalty: None,
            presence_penalty: None,
            thinking_budget: ThinkingBudget::None,
        };
        counter.generate(&mut dialog, &config).await.expect("gen");
        counter.generate(&mut dialog, &config).await.expect("gen");

        let total = counter.total();
        assert_eq!(total.input_tokens, 20);
        assert_eq!(total.output_tokens, 10);
        assert_eq!(total.cache_read_tokens, Some(6));
    }
}
