// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Fixed-length truncation of raw text before it reaches the
// embedder:
//
//   1. Split on whitespace
//   2. Keep the first `max_tokens` tokens
//   3. Re-join with single spaces
//
// The count is over whitespace tokens, not the embedder's own
// tokenisation. The result is laid out as an [N, 1] TextColumn.

use crate::domain::{sample::Sample, text_column::TextColumn};

/// Token budget per sample.
pub const MAX_TOKENS: usize = 250;

pub struct Preprocessor {
    max_tokens: usize,
}

impl Preprocessor {
    pub fn new(max_tokens: usize) -> Self {
        Self { max_tokens }
    }

    /// Keep at most `max_tokens` whitespace-delimited tokens.
    /// Empty or whitespace-only input yields an empty string.
    pub fn truncate(&self, text: &str) -> String {
        text.split_whitespace()
            .take(self.max_tokens)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Truncate the text of every sample, keeping row and label.
    pub fn apply(&self, samples: Vec<Sample>) -> Vec<Sample> {
        samples
            .into_iter()
            .map(|s| Sample {
                text: self.truncate(&s.text),
                ..s
            })
            .collect()
    }

    /// Truncate every text and reshape into a `[n, 1]` column.
    pub fn to_column<S: AsRef<str>>(&self, texts: &[S]) -> TextColumn {
        texts.iter().map(|t| self.truncate(t.as_ref())).collect()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(MAX_TOKENS)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_truncates_to_max_tokens() {
        let p = Preprocessor::default();
        let out = p.truncate(&words(400));
        let tokens: Vec<&str> = out.split_whitespace().collect();
        assert_eq!(tokens.len(), 250);
        assert_eq!(tokens[0], "w0");
        assert_eq!(tokens[249], "w249");
    }

    #[test]
    fn test_short_text_is_unchanged() {
        let p = Preprocessor::default();
        let text = words(250);
        assert_eq!(p.truncate(&text), text);
    }

    #[test]
    fn test_normalises_whitespace() {
        let p = Preprocessor::new(3);
        assert_eq!(p.truncate("  a\tb\n\nc   d "), "a b c");
    }

    #[test]
    fn test_idempotent() {
        let p = Preprocessor::new(5);
        let once = p.truncate("one  two three\tfour five six seven");
        assert_eq!(p.truncate(&once), once);
    }

    #[test]
    fn test_empty_string() {
        let p = Preprocessor::default();
        assert_eq!(p.truncate(""), "");
        assert_eq!(p.truncate("   \n"), "");
    }

    #[test]
    fn test_apply_keeps_identity() {
        use crate::domain::sample::Label;
        let p = Preprocessor::new(1);
        let out = p.apply(vec![Sample::new(4, "x y", Label::Positive)]);
        assert_eq!(out, vec![Sample::new(4, "x", Label::Positive)]);
    }

    #[test]
    fn test_column_shape() {
        let p = Preprocessor::new(2);
        let col = p.to_column(&["a b c", "", "d"]);
        assert_eq!(col.shape(), [3, 1]);
        assert_eq!(col.row(0), Some("a b"));
        assert_eq!(col.row(1), Some(""));
    }
}
