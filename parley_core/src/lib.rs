#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod util;

pub use util::{DEFAULT_FALLBACK_TEXT, DEFAULT_MODEL};

/// Speaker of a single message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One line of dialogue. Fields are private so a message cannot change
/// after it has been created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    role: Role,
    text: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Sampling parameters handed through to a text generation backend.
///
/// The conversation layer never interprets these; they only travel from the
/// configuration file to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub do_sample: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 200,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.95,
            do_sample: true,
        }
    }
}

/// A completion-style model: given a prompt it returns the prompt (or
/// something close to it) followed by its own continuation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
    fn model_name(&self) -> &str;
}

#[async_trait]
impl<T> TextGenerator for std::sync::Arc<T>
where
    T: TextGenerator + ?Sized,
{
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        (**self).generate(prompt).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
