//! Service descriptor types.
//!
//! The config document itself is untyped JSON (the UI owns its schema and
//! sends whatever it has). `CustomLLMService` is the one shape this crate
//! needs to understand, decoded with every field defaulted so a single
//! malformed entry is skipped instead of poisoning the whole document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A configured LLM endpoint.
///
/// `base_url` is the full endpoint URL, not just a host. `auth_type` is one
/// of `apiKey` / `bearer` / `none` (anything else is treated as bearer when
/// a key is present). `provider` selects the wire family: `openai`,
/// `anthropic`, `ollama`, or other OpenAI-compatible. `tool_calling` is
/// `auto` / `native` / `xml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLLMService {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub default_model: String,
    #[serde(default)]
    pub auth_type: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tool_calling: String,
}

impl CustomLLMService {
    /// Whether the service advertises this model (model list or default).
    pub fn advertises(&self, model: &str) -> bool {
        self.models.iter().any(|m| m == model) || (!self.default_model.is_empty() && self.default_model == model)
    }
}
