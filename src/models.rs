use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript entry. `content` only grows while `streaming` is true;
/// a finalized message is never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_selection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Citation>>,
    pub streaming: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            attached_selection: None,
            sources: None,
            streaming: false,
            created_at: Utc::now(),
        }
    }

    /// A finalized user message, optionally carrying the selection that was
    /// pending when it was composed.
    pub fn user(content: String, attached_selection: Option<String>) -> Self {
        Self {
            attached_selection,
            ..Self::new(MessageRole::User, content)
        }
    }

    /// The open assistant placeholder a reply streams into.
    pub fn assistant_streaming() -> Self {
        Self {
            streaming: true,
            ..Self::new(MessageRole::Assistant, String::new())
        }
    }

    /// A finalized assistant message, used for greetings and notices.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content.into())
    }
}

/// Evidence record the backend attaches to a finalized reply.
/// Opaque payload: displayed, never computed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub text: String,
    pub source: String,
    pub chapter: String,
    pub title: String,
    pub score: f64,
}

/// Request body for the streaming chat endpoint. `None` fields serialize as
/// explicit nulls, matching what the service expects.
#[derive(Debug, Clone, Serialize)]
pub struct ChatStreamRequest {
    pub conversation_id: Option<String>,
    pub message: String,
    pub selected_text: Option<String>,
}

/// One event decoded off the response stream.
/// Matches the wire payloads `{"type": ..., "data": ...}`; `done` carries no
/// data member. Unknown tags fail to deserialize and are dropped upstream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    ConversationId { data: String },
    Sources { data: Vec<Citation> },
    Text { data: String },
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_absent_fields_as_null() {
        let req = ChatStreamRequest {
            conversation_id: None,
            message: "hi".to_string(),
            selected_text: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["conversation_id"], serde_json::Value::Null);
        assert_eq!(json["selected_text"], serde_json::Value::Null);
        assert_eq!(json["message"], "hi");
    }

    #[test]
    fn event_variants_deserialize_from_wire_payloads() {
        let ev: ProtocolEvent =
            serde_json::from_str(r#"{"type": "conversation_id", "data": "abc"}"#).unwrap();
        assert_eq!(ev, ProtocolEvent::ConversationId { data: "abc".to_string() });

        let ev: ProtocolEvent = serde_json::from_str(r#"{"type": "done"}"#).unwrap();
        assert_eq!(ev, ProtocolEvent::Done);

        // The backend is free to tack a data member onto done; it is ignored.
        let ev: ProtocolEvent = serde_json::from_str(r#"{"type": "done", "data": true}"#).unwrap();
        assert_eq!(ev, ProtocolEvent::Done);

        let ev: ProtocolEvent = serde_json::from_str(
            r#"{"type": "sources", "data": [{"text": "t", "source": "ch1.md", "chapter": "Chapter 1", "title": "Intro", "score": 0.92}]}"#,
        )
        .unwrap();
        match ev {
            ProtocolEvent::Sources { data } => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].title, "Intro");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_an_error() {
        assert!(serde_json::from_str::<ProtocolEvent>(r#"{"type": "ping"}"#).is_err());
    }
}
