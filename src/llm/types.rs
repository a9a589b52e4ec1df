//! Wire-facing message types.
//!
//! `ApiMessage` is the request-shaped record the turn loop maintains: it
//! serializes directly into both the OpenAI and (after system folding) the
//! Anthropic request bodies. Native tool-call round-trips keep the
//! provider's raw `tool_calls` value so it can be echoed back verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the API-shaped conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Raw provider-shaped tool calls, echoed back unmodified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Value>,
}

impl ApiMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// Assistant frame carrying native tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, raw_calls: Value) -> Self {
        Self {
            role: "assistant".to_string(),
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: Some(raw_calls),
        }
    }

    /// Tool-result frame answering a native call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: "tool".to_string(),
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    /// Approximate token cost of this message (1 token ≈ 4 chars).
    pub fn approx_tokens(&self) -> i64 {
        self.content.as_deref().map(|c| c.len() as i64 / 4).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_message_serializes_minimal() {
        let msg = ApiMessage::new("user", "hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hi");
        assert!(json.get("tool_call_id").is_none());
        assert!(json.get("tool_calls").is_none());
    }

    #[test]
    fn test_tool_result_frame_shape() {
        let msg = ApiMessage::tool_result("c1", "output");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "tool");
        assert_eq!(json["tool_call_id"], "c1");
    }

    #[test]
    fn test_approx_tokens() {
        let msg = ApiMessage::new("user", "x".repeat(40));
        assert_eq!(msg.approx_tokens(), 10);
    }
}
