//! Conversation window.
//!
//! Every message ever appended is kept; only the rendered prompt is bounded.
//! The sliding window is a read-time projection over the stored history.

use std::borrow::Cow;

use parley_core::{Message, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a window.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Invalid window configuration: {0}")]
    InvalidConfiguration(String),
}

/// Labels printed in front of each rendered line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoleLabels {
    #[serde(default = "RoleLabels::default_user")]
    pub user: String,
    #[serde(default = "RoleLabels::default_assistant")]
    pub assistant: String,
}

impl Default for RoleLabels {
    fn default() -> Self {
        Self {
            user: Self::default_user(),
            assistant: Self::default_assistant(),
        }
    }
}

impl RoleLabels {
    fn default_user() -> String {
        "User".to_string()
    }

    fn default_assistant() -> String {
        "Bot".to_string()
    }

    /// Label for the given role.
    #[must_use]
    pub fn label(&self, role: Role) -> &str {
        match role {
            Role::User => &self.user,
            Role::Assistant => &self.assistant,
        }
    }
}

/// Configuration for prompt rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowConfig {
    /// Number of user/assistant pairs included in a rendered prompt
    #[serde(default = "WindowConfig::default_max_turns")]
    pub max_turns: usize,
    #[serde(default)]
    pub role_labels: RoleLabels,
    /// Text placed before the first rendered line, e.g. `"Instruct: "`
    #[serde(default)]
    pub preamble: String,
    /// Appended after the rendered lines to hand the floor to the assistant.
    /// Unset means a new line with the assistant label, e.g. `"\nBot:"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_cue: Option<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_turns: Self::default_max_turns(),
            role_labels: RoleLabels::default(),
            preamble: String::new(),
            trailing_cue: None,
        }
    }
}

impl WindowConfig {
    const fn default_max_turns() -> usize {
        5
    }


    /// Set the number of turns kept in the rendered view.
    #[must_use]
    pub const fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    /// Set the speaker labels.
    #[must_use]
    pub fn with_role_labels(
        mut self,
        user: impl Into<String>,
        assistant: impl Into<String>,
    ) -> Self {
        self.role_labels = RoleLabels {
            user: user.into(),
            assistant: assistant.into(),
        };
        self
    }

    /// Set the text placed before the first rendered line.
    #[must_use]
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Set the trailing cue.
    #[must_use]
    pub fn with_trailing_cue(mut self, cue: impl Into<String>) -> Self {
        self.trailing_cue = Some(cue.into());
        self
    }

    /// Cue appended after the rendered lines.
    #[must_use]
    pub fn trailing_cue(&self) -> Cow<'_, str> {
        self.trailing_cue.as_deref().map_or_else(
            || Cow::Owned(format!("\n{}:", self.role_labels.assistant)),
            Cow::Borrowed,
        )
    }

    /// Check the only precondition a window has.
    pub fn validate(&self) -> Result<(), WindowError> {
        if self.max_turns < 1 {
            return Err(WindowError::InvalidConfiguration(format!(
                "max_turns must be at least 1, got {}",
                self.max_turns
            )));
        }
        Ok(())
    }

    /// Largest number of messages a rendered prompt may contain.
    #[must_use]
    pub const fn max_messages(&self) -> usize {
        self.max_turns.saturating_mul(2)
    }
}

/// Append-only conversation history with a bounded rendered view.
#[derive(Debug, Clone)]
pub struct ConversationWindow {
    config: WindowConfig,
    messages: Vec<Message>,
}

impl ConversationWindow {
    /// Create an empty window.
    pub fn new(config: WindowConfig) -> Result<Self, WindowError> {
        config.validate()?;
        Ok(Self {
            config,
            messages: Vec::new(),
        })
    }

    /// Append one message to the end of the history.
    pub fn append(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(Message::new(role, text));
    }

    /// Render the most recent `max_turns * 2` messages followed by the cue.
    #[must_use]
    pub fn render(&self) -> String {
        self.render_messages(self.recent(self.config.max_messages()))
    }

    /// Render as if `text` had been appended, without storing it.
    ///
    /// The pending message counts against the window like any stored one.
    #[must_use]
    pub fn render_with_pending(&self, role: Role, text: &str) -> String {
        let pending = Message::new(role, text);
        let keep = self.config.max_messages().saturating_sub(1);
        self.render_messages(self.recent(keep).iter().chain(std::iter::once(&pending)))
    }

    /// Drop every stored message.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Full stored history, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of user messages stored so far.
    #[must_use]
    pub fn turn_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role() == Role::User)
            .count()
    }

    #[must_use]
    pub const fn config(&self) -> &WindowConfig {
        &self.config
    }

    fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    fn render_messages<'a>(&self, messages: impl IntoIterator<Item = &'a Message>) -> String {
        let lines: Vec<String> = messages
            .into_iter()
            .map(|m| {
                format!(
                    "{}: {}",
                    self.config.role_labels.label(m.role()),
                    m.text()
                )
            })
            .collect();

        let mut prompt = String::new();
        if !lines.is_empty() {
            prompt.push_str(&self.config.preamble);
            prompt.push_str(&lines.join("\n"));
        }
        prompt.push_str(&self.config.trailing_cue());
        prompt
    }
}
