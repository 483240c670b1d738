//! Tool-result size enforcement.
//!
//! Oversized shell or file output would overflow the model's context window,
//! so every adapter caps tool-result text at a fixed token budget before it
//! is sent. Truncation is a soft degradation: the head and tail halves are
//! kept and a marker is inserted between them.

use crate::config::constants::defaults;

pub const TRUNCATION_MARKER: &str = "\n...[truncated]...\n";

/// Budget applied to each tool result at request-shaping time. One policy for
/// every adapter; per-vendor tuning is configuration, not hard-coded
/// divergence.
#[derive(Debug, Clone, Copy)]
pub struct TruncationPolicy {
    pub max_result_tokens: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            max_result_tokens: defaults::MAX_TOOL_RESULT_TOKENS,
        }
    }
}

/// Rough token count: four bytes per token. None of the supported vendors
/// share a tokenizer, so the budget is enforced with the same estimate for
/// all of them.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Returns `text` unchanged while it fits the budget; otherwise keeps the
/// first and last halves of the budget and joins them with
/// [`TRUNCATION_MARKER`].
pub fn truncate_result(text: &str, policy: &TruncationPolicy) -> String {
    if estimate_tokens(text) <= policy.max_result_tokens {
        return text.to_string();
    }

    let head_tokens = policy.max_result_tokens / 2;
    let tail_tokens = policy.max_result_tokens - head_tokens;
    let head_bytes = head_tokens * 4;
    let tail_bytes = tail_tokens * 4;

    let head_end = floor_char_boundary(text, head_bytes);
    let tail_start = ceil_char_boundary(text, text.len().saturating_sub(tail_bytes));

    let mut out = String::with_capacity(head_end + TRUNCATION_MARKER.len() + tail_bytes);
    out.push_str(&text[..head_end]);
    out.push_str(TRUNCATION_MARKER);
    out.push_str(&text[tail_start..]);
    out
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_result_tokens: usize) -> TruncationPolicy {
        TruncationPolicy { max_result_tokens }
    }

    #[test]
    fn result_at_the_limit_is_untouched() {
        // 10 tokens at 4 bytes each.
        let text = "a".repeat(40);
        assert_eq!(truncate_result(&text, &policy(10)), text);
    }

    #[test]
    fn one_token_over_is_truncated_and_annotated() {
        let text = "a".repeat(44);
        let out = truncate_result(&text, &policy(10));
        assert!(out.contains(TRUNCATION_MARKER));
        assert!(out.len() < text.len() + TRUNCATION_MARKER.len());
    }

    #[test]
    fn truncation_keeps_head_and_tail() {
        let mut text = String::from("HEAD");
        text.push_str(&"x".repeat(10_000));
        text.push_str("TAIL");
        let out = truncate_result(&text, &policy(100));
        assert!(out.starts_with("HEAD"));
        assert!(out.ends_with("TAIL"));
    }

    #[test]
    fn multibyte_input_splits_on_char_boundaries() {
        let text = "é".repeat(1_000);
        let out = truncate_result(&text, &policy(100));
        assert!(out.contains(TRUNCATION_MARKER));
        // Would panic during slicing if a boundary landed inside a char.
    }
}
