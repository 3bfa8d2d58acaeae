#![warn(
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

//! Conversation window and reply extraction for completion-style models.
//!
//! # Key Features
//! - Append-only history with a sliding, turn-bounded prompt view
//! - Reply extraction that strips prompt echoes and hallucinated turns
//! - A `ChatSession` that ties both to a text generator

mod extract;
mod session;
mod window;

pub use extract::{ExtractionConfig, ResponseExtractor};
pub use session::{ChatSession, ConversationError, SessionEnd, TurnResult};
pub use window::{ConversationWindow, RoleLabels, WindowConfig, WindowError};
