//! Response extraction.
//!
//! Completion models hand back the prompt they were given plus their own
//! continuation, and often keep going past the end of the reply by inventing
//! the next speaker's turn. [`ResponseExtractor`] recovers the single reply.

use parley_core::DEFAULT_FALLBACK_TEXT;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How to cut a reply out of raw model output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Marker after whose last occurrence the new content starts
    #[serde(default)]
    pub sentinel: Option<String>,
    /// Substrings that end the reply; earliest occurrence wins
    #[serde(default)]
    pub stop_markers: Vec<String>,
    /// Speaker names the model may echo at the start of its reply
    #[serde(default)]
    pub assistant_prefixes: Vec<String>,
    /// Returned when nothing usable survives extraction
    #[serde(default = "ExtractionConfig::default_fallback_text")]
    pub fallback_text: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sentinel: None,
            stop_markers: Vec::new(),
            assistant_prefixes: Vec::new(),
            fallback_text: Self::default_fallback_text(),
        }
    }
}

impl ExtractionConfig {
    fn default_fallback_text() -> String {
        DEFAULT_FALLBACK_TEXT.to_string()
    }

    #[must_use]
    pub fn with_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.sentinel = Some(sentinel.into());
        self
    }

    #[must_use]
    pub fn with_stop_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_assistant_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.assistant_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = text.into();
        self
    }
}

/// Stateless reply extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseExtractor;

impl ResponseExtractor {
    /// Turn raw model output into a single clean reply.
    ///
    /// Never fails: anything that leaves an empty reply yields
    /// `config.fallback_text`.
    #[must_use]
    pub fn extract(raw_output: &str, prompt: &str, config: &ExtractionConfig) -> String {
        let continuation = isolate_continuation(raw_output, prompt, config.sentinel.as_deref());

        let truncated = match earliest_stop_marker(&continuation, &config.stop_markers) {
            Some((idx, marker)) => {
                debug!("Truncating reply at stop marker {marker:?} (index {idx})");
                &continuation[..idx]
            }
            None => continuation.as_str(),
        };

        let reply = strip_assistant_prefix(truncated.trim(), &config.assistant_prefixes);
        if reply.is_empty() {
            debug!("Extraction left nothing, using fallback reply");
            return config.fallback_text.clone();
        }
        reply.to_string()
    }
}

/// Cut the new content out of the raw output and trim it.
fn isolate_continuation(raw_output: &str, prompt: &str, sentinel: Option<&str>) -> String {
    let sentinel_hit = sentinel
        .filter(|s| !s.is_empty())
        .and_then(|s| raw_output.rfind(s).map(|idx| idx + s.len()));

    if let Some(start) = sentinel_hit {
        return raw_output[start..].trim().to_string();
    }
    if prompt.is_empty() {
        return raw_output.trim().to_string();
    }
    raw_output.replacen(prompt, "", 1).trim().to_string()
}

/// Earliest occurring stop marker as `(index, marker)`.
///
/// Ties on index go to the marker listed first.
fn earliest_stop_marker<'m>(text: &str, markers: &'m [String]) -> Option<(usize, &'m str)> {
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .filter_map(|m| text.find(m.as_str()).map(|idx| (idx, m.as_str())))
        .min_by_key(|(idx, _)| *idx)
}

/// Remove one leading `<prefix>:` where the prefix matches case-insensitively.
fn strip_assistant_prefix<'a>(text: &'a str, prefixes: &[String]) -> &'a str {
    prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .find_map(|p| strip_prefix_ignore_case(text, p).and_then(|rest| rest.strip_prefix(':')))
        .map_or(text, str::trim)
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let rest_start = chars.next().map_or(text.len(), |(idx, _)| idx);
    Some(&text[rest_start..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phi_config() -> ExtractionConfig {
        ExtractionConfig::default()
            .with_sentinel("Output:")
            .with_stop_markers(["\nUser:", "\nBot:", "\n\n"])
            .with_assistant_prefixes(["Bot", "Assistant"])
            .with_fallback_text("sorry")
    }

    #[test]
    fn test_sentinel_and_stop_marker() {
        let raw = "Instruct: hi\nOutput: Paris is the capital.\nUser: what about Italy?";
        let config = ExtractionConfig::default()
            .with_sentinel("Output:")
            .with_stop_markers(["\nUser:"]);

        assert_eq!(
            ResponseExtractor::extract(raw, "Instruct: hi\nOutput:", &config),
            "Paris is the capital."
        );
    }

    #[test]
    fn test_last_sentinel_wins() {
        let raw = "Instruct: q\nOutput: first\nInstruct: q again\nOutput: second";
        assert_eq!(
            ResponseExtractor::extract(raw, "", &phi_config()),
            "second"
        );
    }

    #[test]
    fn test_prompt_removed_once() {
        let prompt = "User: hi\nBot:";
        let raw = "User: hi\nBot: hello there, User: hi\nBot:";
        let config = ExtractionConfig::default();

        assert_eq!(
            ResponseExtractor::extract(raw, prompt, &config),
            "hello there, User: hi\nBot:"
        );
    }

    #[test]
    fn test_missing_prompt_uses_whole_output() {
        let config = ExtractionConfig::default();
        assert_eq!(
            ResponseExtractor::extract("  something new  ", "User: hi\nBot:", &config),
            "something new"
        );
    }

    #[test]
    fn test_stop_marker_at_index_twelve() {
        let raw = "Hello there.\nUser: more";
        assert_eq!(raw.find("\nUser:"), Some(12));

        let config = ExtractionConfig::default().with_stop_markers(["\nUser:"]);
        assert_eq!(
            ResponseExtractor::extract(raw, "", &config),
            "Hello there."
        );
    }

    #[test]
    fn test_earliest_marker_not_first_listed() {
        let raw = "One.\n- bullet\nUser: hi";
        let config = ExtractionConfig::default().with_stop_markers(["\nUser:", "\n-"]);

        assert_eq!(ResponseExtractor::extract(raw, "", &config), "One.");
    }

    #[test]
    fn test_tie_prefers_list_order() {
        let markers = vec!["\nUs".to_string(), "\nUser:".to_string()];
        assert_eq!(
            earliest_stop_marker("ok\nUser: x", &markers),
            Some((2, "\nUs"))
        );

        let reversed: Vec<String> = markers.into_iter().rev().collect();
        assert_eq!(
            earliest_stop_marker("ok\nUser: x", &reversed),
            Some((2, "\nUser:"))
        );
    }

    #[test]
    fn test_no_marker_found() {
        let markers = vec!["\nUser:".to_string()];
        assert_eq!(earliest_stop_marker("plain reply", &markers), None);
    }

    #[test]
    fn test_no_markers_keeps_continuation() {
        let config = ExtractionConfig::default().with_stop_markers(["\nUser:"]);
        assert_eq!(
            ResponseExtractor::extract("  A full answer.  ", "", &config),
            "A full answer."
        );
    }

    #[test]
    fn test_empty_marker_ignored() {
        let config = ExtractionConfig::default().with_stop_markers([""]);
        assert_eq!(ResponseExtractor::extract("kept", "", &config), "kept");
    }

    #[test]
    fn test_prefix_stripped_case_insensitively() {
        let raw = "Output: bot: I am fine.";
        assert_eq!(
            ResponseExtractor::extract(raw, "", &phi_config()),
            "I am fine."
        );
    }

    #[test]
    fn test_prefix_requires_colon() {
        let raw = "Output: Botany is the study of plants.";
        assert_eq!(
            ResponseExtractor::extract(raw, "", &phi_config()),
            "Botany is the study of plants."
        );
    }

    #[test]
    fn test_prefix_stripped_once() {
        assert_eq!(
            strip_assistant_prefix("Bot: Bot: hi", &["Bot".to_string()]),
            "Bot: hi"
        );
    }

    #[test]
    fn test_non_ascii_prefix() {
        assert_eq!(
            strip_assistant_prefix("ÉCHO: salut", &["écho".to_string()]),
            "salut"
        );
    }

    #[test]
    fn test_fallback_on_empty_output() {
        assert_eq!(ResponseExtractor::extract("", "", &phi_config()), "sorry");
        assert_eq!(
            ResponseExtractor::extract("   \n\t ", "", &phi_config()),
            "sorry"
        );
    }

    #[test]
    fn test_fallback_when_only_prefix_before_marker() {
        let raw = "Instruct: hi\nOutput: Bot:\nUser: next";
        assert_eq!(ResponseExtractor::extract(raw, "", &phi_config()), "sorry");
    }

    #[test]
    fn test_leading_blank_lines_trimmed_before_markers() {
        let raw = "Instruct: hi\nOutput:\n\nSure thing.\n\nExercise 1";
        assert_eq!(
            ResponseExtractor::extract(raw, "", &phi_config()),
            "Sure thing."
        );
    }

    #[test]
    fn test_fallback_when_only_prefix_left() {
        assert_eq!(
            ResponseExtractor::extract("Output: Bot:", "", &phi_config()),
            "sorry"
        );
    }

    #[test]
    fn test_prompt_echo_without_sentinel() {
        let prompt = "User: hi\nBot:";
        let raw = "User: hi\nBot: Hello! How can I help?\nUser: tell me a joke";
        let config = ExtractionConfig::default()
            .with_stop_markers(["\nUser:"])
            .with_assistant_prefixes(["Bot"]);

        assert_eq!(
            ResponseExtractor::extract(raw, prompt, &config),
            "Hello! How can I help?"
        );
    }
}
