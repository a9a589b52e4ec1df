//! LLM HTTP client.
//!
//! Stateless request builder and caller: provider-specific body and auth
//! shapes, custom headers applied last, a hard 120 s timeout, and
//! cooperative cancellation. Every obtained response is wrapped in a
//! `RawTurn` audit record with sanitized headers before anything else
//! happens — headers never reach persistence unredacted.

use std::collections::BTreeMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::errors::LlmError;
use super::types::ApiMessage;
use crate::config::CustomLLMService;
use crate::session::RawTurn;

/// Overall HTTP timeout for generation calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for the one-shot service connectivity probe.
const TEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header names that must never be persisted in clear text.
const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "x-api-key",
    "api-key",
    "x-auth-token",
    "x-access-token",
    "cookie",
    "set-cookie",
];

/// One completed HTTP exchange: the audit record plus the raw body.
#[derive(Debug, Clone)]
pub struct HttpTurn {
    pub raw_turn: RawTurn,
    pub status: u16,
    pub body_text: String,
}

/// Response content extracted from a provider envelope.
#[derive(Debug, Clone)]
pub struct ParsedTurn {
    /// Visible text (may be empty for a native tool-calls-only response).
    pub text: String,
    /// The raw `choices[0].message` object, native dialect only.
    pub message: Option<Value>,
}

pub struct LlmClient {
    http: reqwest::Client,
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Send one generation request and record the exchange.
    ///
    /// Returns `Ok` for any response with a readable body, including error
    /// statuses — the caller records the audit entry first and then runs
    /// [`parse`](Self::parse), which turns a ≥400 status into the fatal
    /// error. Transport failures (no response body) return `Err` directly.
    pub async fn call(
        &self,
        service: &CustomLLMService,
        model: &str,
        messages: &[ApiMessage],
        tools: Option<&[Value]>,
        cancel: &CancellationToken,
    ) -> Result<HttpTurn, LlmError> {
        let body = build_request_body(service, model, messages, tools);
        let request_json =
            serde_json::to_string_pretty(&body).map_err(|e| LlmError::Parse {
                reason: format!("failed to marshal request: {e}"),
            })?;
        let headers = build_headers(service);

        tracing::info!(
            url = %service.base_url,
            provider = %service.provider,
            model = %model,
            message_count = messages.len(),
            has_tools = tools.is_some(),
            "sending LLM request"
        );

        let mut request = self
            .http
            .post(&service.base_url)
            .timeout(REQUEST_TIMEOUT)
            .body(request_json.clone());
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let response = tokio::select! {
            resp = request.send() => resp.map_err(|e| LlmError::Transport {
                reason: e.to_string(),
            })?,
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
        };

        let status = response.status().as_u16();
        let body_text = tokio::select! {
            text = response.text() => text.map_err(|e| LlmError::Transport {
                reason: format!("failed to read response: {e}"),
            })?,
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
        };

        Ok(HttpTurn {
            raw_turn: RawTurn {
                provider: service.provider.clone(),
                model: model.to_string(),
                url: Some(service.base_url.clone()),
                method: Some("POST".to_string()),
                status: json!(status),
                request_headers: Some(sanitize_headers(&headers)),
                request: request_json,
                response: body_text.clone(),
            },
            status,
            body_text,
        })
    }

    /// Extract the provider envelope from a completed exchange.
    pub fn parse(
        &self,
        service: &CustomLLMService,
        turn: &HttpTurn,
    ) -> Result<ParsedTurn, LlmError> {
        if turn.status >= 400 {
            return Err(LlmError::Http {
                status: turn.status,
                detail: format!("{}{}", turn.body_text, debug_info(&turn.raw_turn)),
            });
        }

        let body: Value =
            serde_json::from_str(&turn.body_text).map_err(|e| LlmError::Parse {
                reason: e.to_string(),
            })?;

        if service.provider == "anthropic" {
            let text = body
                .get("content")
                .and_then(Value::as_array)
                .and_then(|blocks| blocks.first())
                .and_then(|block| block.get("text"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(ParsedTurn { text, message: None });
        }

        let message = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .cloned();
        let text = message
            .as_ref()
            .and_then(|m| m.get("content"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(ParsedTurn { text, message })
    }

    /// One-shot connectivity probe for a service configuration.
    ///
    /// HTTP failures are reported in the payload, not raised; only a
    /// transport failure is an error.
    pub async fn test_service(&self, service: &CustomLLMService) -> Result<Value, LlmError> {
        let body = json!({
            "model": service.default_model,
            "messages": [{ "role": "user", "content": "Hello, this is a test message." }],
            "max_tokens": 10,
        });
        let headers = build_headers(service);

        let mut request = self
            .http
            .post(&service.base_url)
            .timeout(TEST_TIMEOUT)
            .json(&body);
        for (name, value) in &headers {
            request = request.header(name, value);
        }

        let response = request.send().await.map_err(|e| LlmError::Transport {
            reason: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let body_text = response.text().await.map_err(|e| LlmError::Transport {
            reason: format!("failed to read response: {e}"),
        })?;

        if status >= 400 {
            return Ok(json!({
                "success": false,
                "status": status,
                "error": body_text,
                "message": "Service test failed",
            }));
        }

        match serde_json::from_str::<Value>(&body_text) {
            Ok(parsed) => Ok(json!({
                "success": true,
                "status": status,
                "response": parsed,
                "message": "Service test successful",
            })),
            Err(_) => Ok(json!({
                "success": false,
                "status": status,
                "error": "Invalid JSON response",
                "message": "Service test failed",
            })),
        }
    }
}

// ─── Request Building ───────────────────────────────────────────────────────

/// Build the provider-native request body.
fn build_request_body(
    service: &CustomLLMService,
    model: &str,
    messages: &[ApiMessage],
    tools: Option<&[Value]>,
) -> Value {
    if service.provider == "anthropic" {
        // System messages fold into the dedicated `system` string.
        let mut system = String::new();
        let mut rest: Vec<&ApiMessage> = Vec::new();
        for msg in messages {
            if msg.role == "system" {
                if let Some(content) = &msg.content {
                    system.push_str(content);
                    system.push('\n');
                }
            } else {
                rest.push(msg);
            }
        }
        return json!({
            "model": model,
            "messages": rest,
            "max_tokens": 4096,
            "system": system.trim(),
        });
    }

    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": 1,
        "top_p": 0.95,
        "max_tokens": 2048,
    });
    if let Some(tools) = tools {
        body["tools"] = Value::Array(tools.to_vec());
        body["tool_choice"] = json!("auto");
    }
    body
}

/// Assemble outbound headers: provider defaults first, static custom
/// headers last so they may override anything.
fn build_headers(service: &CustomLLMService) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    if service.provider == "anthropic" {
        headers.insert("x-api-key".to_string(), service.api_key.clone());
        headers.insert(
            "anthropic-version".to_string(),
            "2023-06-01".to_string(),
        );
    } else {
        match service.auth_type.as_str() {
            "none" => {}
            // apiKey, bearer, and anything else non-empty all mean bearer.
            _ => {
                if !service.api_key.is_empty() {
                    headers.insert(
                        "Authorization".to_string(),
                        format!("Bearer {}", service.api_key),
                    );
                }
            }
        }
    }

    for (key, value) in &service.headers {
        headers.insert(key.clone(), value.clone());
    }
    headers
}

// ─── Sanitization ───────────────────────────────────────────────────────────

/// Redact credential-bearing headers, preserving the `Bearer` prefix so
/// the auth scheme stays diagnosable. Returns the JSON string persisted
/// into `rawTurns`.
pub fn sanitize_headers(headers: &BTreeMap<String, String>) -> String {
    let mut sanitized = BTreeMap::new();
    for (name, value) in headers {
        let lower = name.to_lowercase();
        let value = if SENSITIVE_HEADERS.contains(&lower.as_str()) {
            if lower == "authorization" && value.starts_with("Bearer ") {
                "Bearer <redacted>".to_string()
            } else {
                "<redacted>".to_string()
            }
        } else {
            value.clone()
        };
        sanitized.insert(name.clone(), value);
    }
    serde_json::to_string(&sanitized).unwrap_or_default()
}

/// Diagnostic block appended to transport-level failures.
fn debug_info(turn: &RawTurn) -> String {
    format!(
        "\n\n<debug_info>\n<request_headers>\n{}\n</request_headers>\n<request>\n{}\n</request>\n<response>\n{}\n</response>\n</debug_info>",
        turn.request_headers.as_deref().unwrap_or(""),
        turn.request,
        turn.response,
    )
}

/// Diagnostic block for an empty model response.
pub(crate) fn empty_response_detail(turn: &RawTurn) -> String {
    debug_info(turn)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
