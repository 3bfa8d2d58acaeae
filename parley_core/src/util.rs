//! Shared defaults.

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "microsoft/phi-1_5";

/// Reply used when nothing usable survives response extraction.
pub const DEFAULT_FALLBACK_TEXT: &str =
    "I'm sorry, I couldn't generate a clear response for that. Can you please rephrase?";
