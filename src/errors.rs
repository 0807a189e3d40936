use thiserror::Error;

/// Transport-level failure for one streaming turn. Every variant is terminal
/// for the turn that hit it and degrades to the configured failure notice;
/// the session itself stays usable.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to reach the chat service: {message}")]
    Connect { message: String },

    #[error("Chat service returned status {status}")]
    Status { status: u16 },

    #[error("Response stream interrupted: {message}")]
    Interrupted { message: String },
}

impl TransportError {
    pub fn connect(message: impl Into<String>) -> Self {
        TransportError::Connect { message: message.into() }
    }

    pub fn interrupted(message: impl Into<String>) -> Self {
        TransportError::Interrupted { message: message.into() }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, TransportError::Status { .. })
    }
}
