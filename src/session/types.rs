//! Session data model.
//!
//! A session is an ordered conversation plus its task list. Messages carry
//! two halves: `info` (role, timestamps, audit bundle) and `parts` (typed
//! content fragments). Older builds persisted `parts` as free-form JSON
//! objects, so reading tolerates both shapes; new writes always emit the
//! typed shape.

use serde::{Deserialize, Serialize};

// ─── Todos ──────────────────────────────────────────────────────────────────

/// Lifecycle state of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

/// Priority of a todo item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    Medium,
    High,
}

/// A task tracked inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: String,
    pub content: String,
    pub status: TodoStatus,
    pub priority: TodoPriority,
}

// ─── Audit Trail ────────────────────────────────────────────────────────────

/// Audit record of one provider round-trip.
///
/// `status` is the HTTP status code for real turns and the string `"mock"`
/// for the unconfigured echo path, so it is kept as a raw JSON value.
/// `request_headers` is a JSON string of the outbound headers, sanitized
/// before it ever reaches this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTurn {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default)]
    pub status: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<String>,
    #[serde(default)]
    pub request: String,
    #[serde(default)]
    pub response: String,
}

// ─── Messages ───────────────────────────────────────────────────────────────

/// One content fragment of a message.
///
/// The typed variant is what this crate writes. Anything else that may sit
/// in an old sessions file decodes as `Legacy` and is normalized on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessagePart {
    Text {
        #[serde(rename = "type")]
        kind: String,
        text: String,
        #[serde(rename = "tokenCount", skip_serializing_if = "Option::is_none")]
        token_count: Option<u32>,
    },
    Legacy(serde_json::Value),
}

impl MessagePart {
    /// A typed text part.
    pub fn text(text: impl Into<String>) -> Self {
        MessagePart::Text {
            kind: "text".to_string(),
            text: text.into(),
            token_count: None,
        }
    }

    /// The text content, whichever shape the part was stored in.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text { text, .. } => Some(text),
            MessagePart::Legacy(value) => value.get("text").and_then(|t| t.as_str()),
        }
    }
}

/// Message metadata: role, ids, timestamps, and the audit bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageInfo {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// First outbound request body of the turn that produced this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_request: Option<String>,
    /// Last inbound response body of the turn that produced this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub raw_turns: Vec<RawTurn>,
}

/// A stored conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub info: MessageInfo,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl Message {
    /// Role and text of this message, or `None` when neither half is usable
    /// (e.g. a legacy record with no text part).
    pub fn normalize(&self) -> Option<(&str, &str)> {
        let role = self.info.role.trim();
        if role.is_empty() {
            return None;
        }
        let text = self.parts.first().and_then(|p| p.as_text())?;
        Some((role, text))
    }
}

// ─── Sessions ───────────────────────────────────────────────────────────────

/// A persistent conversation with its own task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub todos: Vec<TodoItem>,
}

/// Child-session entry returned by the children listing.
#[derive(Debug, Clone, Serialize)]
pub struct SessionChild {
    pub id: String,
    pub title: String,
    pub state: String,
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_part_round_trip() {
        let part = MessagePart::text("hello");
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");

        let back: MessagePart = serde_json::from_value(json).unwrap();
        assert_eq!(back.as_text(), Some("hello"));
    }

    #[test]
    fn test_legacy_part_text_extraction() {
        // Old builds stored parts as loose objects with extra fields.
        let raw = serde_json::json!({"text": "from legacy", "weird": 1});
        let part: MessagePart = serde_json::from_value(raw).unwrap();
        assert_eq!(part.as_text(), Some("from legacy"));
    }

    #[test]
    fn test_normalize_skips_empty_role() {
        let msg = Message {
            info: MessageInfo::default(),
            parts: vec![MessagePart::text("content")],
        };
        assert!(msg.normalize().is_none());
    }

    #[test]
    fn test_normalize_typed_message() {
        let msg = Message {
            info: MessageInfo {
                role: "user".to_string(),
                ..Default::default()
            },
            parts: vec![MessagePart::text("hi")],
        };
        assert_eq!(msg.normalize(), Some(("user", "hi")));
    }

    #[test]
    fn test_session_decodes_with_missing_fields() {
        let raw = serde_json::json!({
            "id": "session_1",
            "messages": [
                {"info": {"role": "user"}, "parts": [{"type": "text", "text": "x"}]}
            ]
        });
        let session: Session = serde_json::from_value(raw).unwrap();
        assert_eq!(session.id, "session_1");
        assert!(session.todos.is_empty());
        assert_eq!(session.messages.len(), 1);
    }

    #[test]
    fn test_raw_turn_mock_status() {
        let turn = RawTurn {
            provider: "openspace".to_string(),
            model: "mock-model".to_string(),
            url: None,
            method: None,
            status: serde_json::Value::String("mock".to_string()),
            request_headers: None,
            request: "{}".to_string(),
            response: "{}".to_string(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["status"], "mock");
        assert!(json.get("url").is_none());
    }
}
