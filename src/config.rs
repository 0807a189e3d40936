/// Minimum selected-text length (in characters) worth offering to ask about.
pub const MIN_SELECTION_CHARS: usize = 20;

const MAX_MESSAGE_LENGTH: usize = 8000;

const DEFAULT_ENDPOINT: &str = "http://localhost:8000/api/v1/chat/stream";

const GREETING: &str = "Hello! I'm the book assistant. I can answer questions about \
     the book's content.\n\nYou can also **select any text** in the book and ask me \
     about it specifically!";

const SELECTION_GREETING: &str =
    "I can see you selected some text from the book. What would you like to know about it?";

const CLEARED_GREETING: &str = "Chat cleared! Ask me anything about the book.";

const FAILURE_NOTICE: &str = "Sorry, I couldn't connect to the backend. \
     Please make sure the API server is running.";

/// Per-session settings. Built once and handed to [`crate::ChatSession`];
/// nothing here is read from ambient state after construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Streaming chat endpoint the transport POSTs to.
    pub endpoint: String,
    /// Assistant message seeding a fresh session.
    pub greeting: String,
    /// Greeting used instead when the session opens with a captured selection.
    pub selection_greeting: String,
    /// Greeting installed by `clear()`.
    pub cleared_greeting: String,
    /// Fixed text that replaces a reply when its turn fails.
    pub failure_notice: String,
    /// Selections shorter than this (trimmed) are ignored.
    pub min_selection_chars: usize,
    /// Sends longer than this are rejected.
    pub max_message_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            greeting: GREETING.to_string(),
            selection_greeting: SELECTION_GREETING.to_string(),
            cleared_greeting: CLEARED_GREETING.to_string(),
            failure_notice: FAILURE_NOTICE.to_string(),
            min_selection_chars: MIN_SELECTION_CHARS,
            max_message_length: MAX_MESSAGE_LENGTH,
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `BOOKCHAT_*` environment variables where set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.endpoint =
            std::env::var("BOOKCHAT_API_URL").unwrap_or_else(|_| config.endpoint.clone());
        if let Some(max) = std::env::var("BOOKCHAT_MAX_MESSAGE_LENGTH")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.max_message_length = max;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_complete() {
        let config = SessionConfig::default();
        assert!(config.endpoint.ends_with("/chat/stream"));
        assert_eq!(config.min_selection_chars, 20);
        assert!(!config.failure_notice.is_empty());
        assert_ne!(config.greeting, config.cleared_greeting);
    }
}
