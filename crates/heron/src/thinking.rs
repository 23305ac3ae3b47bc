//! Streaming classifier that splits `<think>…</think>` reasoning markup off
//! the visible answer.
//!
//! This is an incremental scanner over raw text fragments. A marker may be
//! split across arbitrary fragment boundaries, so the scanner holds a
//! carry-over of at most one marker length minus one byte between pushes.
//! Re-partitioning is lossless: concatenating every emission in order
//! reproduces the input with only the marker text deleted.
//!
//! # Example
//!
//! ```
//! use heron::thinking::{Channel, ThinkingClassifier};
//!
//! let mut classifier = ThinkingClassifier::new(true);
//! let mut tokens = classifier.push("Hello <think>hmm</think> world");
//! tokens.extend(classifier.finish());
//!
//! let response: String = tokens
//!     .iter()
//!     .filter(|t| t.channel == Channel::Response)
//!     .map(|t| t.text.as_str())
//!     .collect();
//! assert_eq!(response, "Hello  world");
//! ```

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

/// Small coalescing threshold for thinking output. Some backends stream one
/// character at a time; buffering to this size keeps the emission count sane
/// without affecting the re-partitioning.
const DEFAULT_FLUSH_THRESHOLD: usize = 64;

/// Which logical channel a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Response,
    Thinking,
}

/// A classified fragment of streamed output.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StreamToken {
    pub text: String,
    pub channel: Channel,
}

impl StreamToken {
    pub fn response(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel: Channel::Response,
        }
    }

    pub fn thinking(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            channel: Channel::Thinking,
        }
    }
}

/// Incremental `<think>` marker scanner.
///
/// For models without reasoning output the classifier is constructed
/// disabled and passes every fragment straight through on the response
/// channel, marker lookalikes included.
pub struct ThinkingClassifier {
    enabled: bool,
    inside: bool,
    /// Unclassified tail, at most one marker length minus one byte once a
    /// push returns.
    pending: String,
    /// Coalesced thinking content awaiting flush.
    thinking_buf: String,
    flush_threshold: usize,
}

// SAFETY: all slice positions come from `find` of an ASCII marker or from
// suffix lengths of that marker, so every index is a char boundary.
#[allow(clippy::string_slice)]
impl ThinkingClassifier {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            inside: false,
            pending: String::new(),
            thinking_buf: String::new(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }

    #[cfg(test)]
    fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    /// Feed one raw fragment, returning whatever can be classified so far.
    pub fn push(&mut self, fragment: &str) -> Vec<StreamToken> {
        if !self.enabled {
            if fragment.is_empty() {
                return Vec::new();
            }
            return vec![StreamToken::response(fragment)];
        }

        self.pending.push_str(fragment);
        let mut out = Vec::new();

        loop {
            if self.inside {
                if let Some(idx) = self.pending.find(THINK_CLOSE) {
                    self.thinking_buf.push_str(&self.pending[..idx]);
                    self.pending.drain(..idx + THINK_CLOSE.len());
                    self.inside = false;
                    if !self.thinking_buf.is_empty() {
                        out.push(StreamToken::thinking(std::mem::take(&mut self.thinking_buf)));
                    }
                } else {
                    // Keep back anything that could be the start of the
                    // closing marker; absorb the rest.
                    let keep = partial_marker_suffix(&self.pending, THINK_CLOSE);
                    let absorb = self.pending.len() - keep;
                    if absorb > 0 {
                        self.thinking_buf.push_str(&self.pending[..absorb]);
                        self.pending.drain(..absorb);
                    }
                    if self.thinking_buf.len() >= self.flush_threshold {
                        out.push(StreamToken::thinking(std::mem::take(&mut self.thinking_buf)));
                    }
                    break;
                }
            } else if let Some(idx) = self.pending.find(THINK_OPEN) {
                if idx > 0 {
                    out.push(StreamToken::response(&self.pending[..idx]));
                }
                self.pending.drain(..idx + THINK_OPEN.len());
                self.inside = true;
            } else {
                let keep = partial_marker_suffix(&self.pending, THINK_OPEN);
                let emit = self.pending.len() - keep;
                if emit > 0 {
                    out.push(StreamToken::response(&self.pending[..emit]));
                    self.pending.drain(..emit);
                }
                break;
            }
        }

        out
    }

    /// Close the stream, flushing anything still buffered. An unterminated
    /// `<think>` span is treated as implicitly closed so its content is never
    /// dropped; a dangling partial marker outside a span is literal text.
    pub fn finish(&mut self) -> Vec<StreamToken> {
        let mut out = Vec::new();
        if self.inside {
            self.thinking_buf.push_str(&self.pending);
            self.pending.clear();
            if !self.thinking_buf.is_empty() {
                out.push(StreamToken::thinking(std::mem::take(&mut self.thinking_buf)));
            }
            self.inside = false;
        } else if !self.pending.is_empty() {
            out.push(StreamToken::response(std::mem::take(&mut self.pending)));
        }
        out
    }

    /// Classify a complete text in one pass, returning the response text and
    /// the concatenated thinking content, if any.
    pub fn split_text(model_has_reasoning: bool, text: &str) -> (String, Option<String>) {
        let mut classifier = ThinkingClassifier::new(model_has_reasoning);
        let mut tokens = classifier.push(text);
        tokens.extend(classifier.finish());

        let mut response = String::new();
        let mut thinking = String::new();
        let mut saw_thinking = false;
        for token in tokens {
            match token.channel {
                Channel::Response => response.push_str(&token.text),
                Channel::Thinking => {
                    saw_thinking = true;
                    thinking.push_str(&token.text);
                }
            }
        }
        (response, saw_thinking.then_some(thinking))
    }
}

/// Length in bytes of the longest proper prefix of `marker` that `text` ends
/// with. Both markers are ASCII, so the returned length is always at a char
/// boundary of `text`.
fn partial_marker_suffix(text: &str, marker: &str) -> usize {
    let max = marker.len().saturating_sub(1).min(text.len());
    for k in (1..=max).rev() {
        if text.ends_with(&marker[..k]) {
            return k;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    /// Run chunks through a classifier and collect every emission, including
    /// the end-of-stream flush.
    fn stream(enabled: bool, chunks: &[&str]) -> Vec<StreamToken> {
        let mut classifier = ThinkingClassifier::new(enabled).with_flush_threshold(4);
        let mut tokens: Vec<StreamToken> = chunks
            .iter()
            .flat_map(|chunk| classifier.push(chunk))
            .collect();
        tokens.extend(classifier.finish());
        tokens
    }

    fn channel_text(tokens: &[StreamToken], channel: Channel) -> String {
        tokens
            .iter()
            .filter(|t| t.channel == channel)
            .map(|t| t.text.as_str())
            .collect()
    }

    #[test_case(
        &["Hello <think>pondering</think>world"],
        "Hello world", "pondering"
        ; "single fragment with one span"
    )]
    #[test_case(
        &["Hello ", "<think>", "pondering", "</think>", "world"],
        "Hello world", "pondering"
        ; "markers in their own fragments"
    )]
    #[test_case(
        &["Hello <thi", "nk>ponder", "ing</thi", "nk>world"],
        "Hello world", "pondering"
        ; "markers split mid-token"
    )]
    #[test_case(
        &["<", "t", "h", "i", "n", "k", ">", "a", "<", "/", "t", "h", "i", "n", "k", ">", "b"],
        "b", "a"
        ; "single character fragments"
    )]
    #[test_case(
        &["one<think>two</think>three<think>four</think>five"],
        "onethreefive", "twofour"
        ; "multiple spans"
    )]
    #[test_case(
        &["no markup at all"],
        "no markup at all", ""
        ; "plain response text"
    )]
    #[test_case(
        &["a < b and a <thin and that's it"],
        "a < b and a <thin and that's it", ""
        ; "angle brackets that never become markers"
    )]
    fn test_channel_partition(chunks: &[&str], response: &str, thinking: &str) {
        let tokens = stream(true, chunks);
        assert_eq!(channel_text(&tokens, Channel::Response), response);
        assert_eq!(channel_text(&tokens, Channel::Thinking), thinking);
    }

    #[test]
    fn unterminated_span_flushes_as_thinking() {
        let tokens = stream(true, &["before<think>never closed"]);
        assert_eq!(channel_text(&tokens, Channel::Response), "before");
        assert_eq!(channel_text(&tokens, Channel::Thinking), "never closed");
    }

    #[test]
    fn dangling_partial_open_marker_is_literal_text() {
        let tokens = stream(true, &["answer ends with <thi"]);
        assert_eq!(
            channel_text(&tokens, Channel::Response),
            "answer ends with <thi"
        );
        assert!(channel_text(&tokens, Channel::Thinking).is_empty());
    }

    #[test]
    fn arbitrary_split_points_match_whole_input() {
        let input = "intro <think>deep thought</think> middle <think>more</think> outro";
        let whole = stream(true, &[input]);
        let expected_response = channel_text(&whole, Channel::Response);
        let expected_thinking = channel_text(&whole, Channel::Thinking);

        for split in 1..input.len() {
            let chunks = [&input[..split], &input[split..]];
            let tokens = stream(true, &chunks);
            assert_eq!(
                channel_text(&tokens, Channel::Response),
                expected_response,
                "response mismatch splitting at {}",
                split
            );
            assert_eq!(
                channel_text(&tokens, Channel::Thinking),
                expected_thinking,
                "thinking mismatch splitting at {}",
                split
            );
        }
    }

    #[test]
    fn emission_order_is_lossless_modulo_markers() {
        let input = "a<think>b</think>c";
        let tokens = stream(true, &[input]);
        let all: String = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(all, "abc");
    }

    #[test]
    fn disabled_classifier_passes_markers_through() {
        let tokens = stream(false, &["raw <think>not special</think> text"]);
        assert_eq!(
            channel_text(&tokens, Channel::Response),
            "raw <think>not special</think> text"
        );
        assert!(tokens.iter().all(|t| t.channel == Channel::Response));
    }

    #[test]
    fn thinking_fragments_coalesce_up_to_threshold() {
        let mut classifier = ThinkingClassifier::new(true).with_flush_threshold(4);
        assert!(classifier.push("<think>").is_empty());
        assert!(classifier.push("a").is_empty());
        assert!(classifier.push("b").is_empty());
        assert!(classifier.push("c").is_empty());
        // Crosses the threshold: one coalesced emission.
        let tokens = classifier.push("d");
        assert_eq!(tokens, vec![StreamToken::thinking("abcd")]);
        let tokens = classifier.push("e</think>f");
        assert_eq!(
            tokens,
            vec![StreamToken::thinking("e"), StreamToken::response("f")]
        );
        assert!(classifier.finish().is_empty());
    }

    #[test]
    fn split_text_returns_both_channels() {
        let (response, thinking) =
            ThinkingClassifier::split_text(true, "x<think>reasoning</think>y");
        assert_eq!(response, "xy");
        assert_eq!(thinking.as_deref(), Some("reasoning"));
    }

    #[test]
    fn split_text_without_markup_has_no_thinking() {
        let (response, thinking) = ThinkingClassifier::split_text(true, "just an answer");
        assert_eq!(response, "just an answer");
        assert!(thinking.is_none());
    }

    #[test]
    fn split_text_skips_classification_for_non_reasoning_models() {
        let (response, thinking) =
            ThinkingClassifier::split_text(false, "contains <think> literally");
        assert_eq!(response, "contains <think> literally");
        assert!(thinking.is_none());
    }
}
