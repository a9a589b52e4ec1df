//! sendMessage and summarizeSession.
//!
//! `send_message` is the full pipeline: cancel-scope acquisition, routing,
//! the mock path for unconfigured models, history normalization, system
//! prompt selection, the turn loop, and the atomic two-message append.
//! Nothing is persisted until the assistant reply is ready — an error
//! anywhere abandons the transaction, including the user's input.

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::{Orchestrator, OrchestratorError};
use crate::config::{resolve, split_provider_model, CustomLLMService, RouteTarget};
use crate::llm::dialect::resolve_dialect;
use crate::llm::prompt::{build_system_prompt, PLAN_MODE_PREFIX};
use crate::llm::{run_tool_loop, ApiMessage};
use crate::session::store::now_ms;
use crate::session::{Message, MessageInfo, MessagePart, RawTurn, Session};

/// Offset separating the assistant timestamp from its paired user message,
/// keeping ordering deterministic within one millisecond tick.
const ASSISTANT_TS_OFFSET: i64 = 100;

impl Orchestrator {
    /// Send a user message into a session and drive the tool-use loop.
    ///
    /// Returns the persisted assistant message. Starting a second send for
    /// the same session preempts the first.
    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
        model: &str,
        _agent: &str,
    ) -> Result<Message, OrchestratorError> {
        if session_id.trim().is_empty() {
            return Err(OrchestratorError::Validation {
                reason: "sessionId is required".to_string(),
            });
        }
        if text.is_empty() {
            return Err(OrchestratorError::Validation {
                reason: "message text is required".to_string(),
            });
        }

        let scope = self.cancels().begin(session_id);
        let result = self
            .send_message_inner(session_id, text, model, scope.token.clone())
            .await;
        self.cancels().end(session_id, &scope);
        result
    }

    async fn send_message_inner(
        &self,
        session_id: &str,
        text: &str,
        model: &str,
        cancel: CancellationToken,
    ) -> Result<Message, OrchestratorError> {
        match resolve(&self.config().snapshot(), model) {
            RouteTarget::Mock => {
                let (_, model_id) = split_provider_model(model);
                self.mock_reply(session_id, text, model_id)
            }
            RouteTarget::Service { service, model } => {
                self.llm_reply(session_id, text, &service, &model, cancel)
                    .await
            }
        }
    }

    // ─── Mock Path ──────────────────────────────────────────────────────

    /// The unconfigured behavior: a fixed echo reply, persisted like any
    /// other turn, produced without HTTP.
    fn mock_reply(
        &self,
        session_id: &str,
        text: &str,
        model: &str,
    ) -> Result<Message, OrchestratorError> {
        // Fail on unknown sessions before building anything.
        self.store().get(session_id)?;

        let now = now_ms();
        let model = if model.is_empty() { "mock-model" } else { model };

        let request = pretty(&json!({
            "provider": "openspace",
            "model": model,
            "messages": [{ "role": "user", "content": text }],
        }));
        let response_text = format!(
            "I received your message: {text}\n\nThis is a mock response from the default \
             provider. To use a real AI, please configure a custom provider in Settings."
        );
        let response = pretty(&json!({
            "provider": "openspace",
            "model": model,
            "content": response_text,
        }));

        let raw_turns = vec![RawTurn {
            provider: "openspace".to_string(),
            model: model.to_string(),
            url: None,
            method: None,
            status: json!("mock"),
            request_headers: None,
            request: request.clone(),
            response: response.clone(),
        }];

        let user = Message {
            info: MessageInfo {
                role: "user".to_string(),
                id: format!("msg_{now}"),
                created_at: now,
                raw_request: Some(request),
                raw_turns: raw_turns.clone(),
                ..Default::default()
            },
            parts: vec![MessagePart::text(text)],
        };
        let assistant = Message {
            info: MessageInfo {
                role: "assistant".to_string(),
                id: format!("msg_{}", now + ASSISTANT_TS_OFFSET),
                created_at: now + ASSISTANT_TS_OFFSET,
                model: Some(model.to_string()),
                raw_response: Some(response),
                raw_turns,
                ..Default::default()
            },
            parts: vec![MessagePart::text(&response_text)],
        };

        Ok(self.store().append_messages(
            session_id,
            user,
            assistant,
            now + ASSISTANT_TS_OFFSET,
        )?)
    }

    // ─── LLM Path ───────────────────────────────────────────────────────

    async fn llm_reply(
        &self,
        session_id: &str,
        text: &str,
        service: &CustomLLMService,
        model: &str,
        cancel: CancellationToken,
    ) -> Result<Message, OrchestratorError> {
        let session = self.store().get(session_id)?;

        let plan_mode = text.starts_with(PLAN_MODE_PREFIX);
        let dialect = resolve_dialect(service);
        let system_prompt =
            build_system_prompt(dialect, plan_mode, self.workspace().root());

        let mut messages = vec![ApiMessage::new("system", system_prompt)];
        messages.extend(api_history(&session));
        messages.push(ApiMessage::new("user", text));

        let tool_ctx = self.tool_ctx(cancel);
        let output = run_tool_loop(
            self.client(),
            self.registry(),
            &tool_ctx,
            session_id,
            service,
            model,
            messages,
            plan_mode,
        )
        .await?;

        let now = now_ms();
        let user = Message {
            info: MessageInfo {
                role: "user".to_string(),
                id: format!("msg_{now}"),
                created_at: now,
                raw_request: output.raw_turns.first().map(|t| t.request.clone()),
                raw_turns: output.raw_turns.clone(),
                ..Default::default()
            },
            parts: vec![MessagePart::text(text)],
        };
        let assistant = Message {
            info: MessageInfo {
                role: "assistant".to_string(),
                id: format!("msg_{}", now + ASSISTANT_TS_OFFSET),
                created_at: now + ASSISTANT_TS_OFFSET,
                model: Some(model.to_string()),
                service: Some(service.id.clone()),
                raw_response: output.raw_turns.last().map(|t| t.response.clone()),
                raw_turns: output.raw_turns,
                ..Default::default()
            },
            parts: vec![MessagePart::text(&output.text)],
        };

        Ok(self.store().append_messages(
            session_id,
            user,
            assistant,
            now + ASSISTANT_TS_OFFSET,
        )?)
    }

    // ─── Summarization ──────────────────────────────────────────────────

    /// Summarize a session in one provider call (no tool loop) and store
    /// the result. Falls back to a counted summary when no service is
    /// usable or the call fails.
    pub async fn summarize_session(
        &self,
        session_id: &str,
        provider_id: &str,
        model_id: &str,
    ) -> Result<Value, OrchestratorError> {
        let session = self.store().get(session_id)?;
        let message_count = session.messages.len();

        let services = self.config().custom_services();
        let service = if !provider_id.is_empty() {
            services.iter().find(|s| s.id == provider_id)
        } else {
            None
        }
        .or_else(|| services.iter().find(|s| s.enabled));

        let Some(service) = service else {
            return Ok(fallback_summary(&session, provider_id, model_id));
        };

        let model = if model_id.is_empty() {
            service.default_model.clone()
        } else {
            model_id.to_string()
        };

        // Last 50 turns keep the request under provider token limits.
        let mut messages = api_history_tail(&session, 50);
        messages.push(ApiMessage::new(
            "user",
            "Please provide a concise summary of the above conversation. Focus on the \
             main topics discussed and any decisions made.",
        ));

        let cancel = CancellationToken::new();
        let summary = match self
            .client()
            .call(service, &model, &messages, None, &cancel)
            .await
        {
            Ok(turn) => match self.client().parse(service, &turn) {
                Ok(parsed) if !parsed.text.is_empty() => Some(parsed.text),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!(error = %e, "summary generation failed");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "summary generation failed");
                None
            }
        };

        let Some(summary) = summary else {
            return Ok(fallback_summary(&session, provider_id, model_id));
        };

        self.store().set_summary(session_id, &summary)?;
        Ok(json!({
            "summary": summary,
            "messageCount": message_count,
            "provider": service.id,
            "model": model,
        }))
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Stored messages as `{role, content}` records, tolerating both the
/// typed and legacy parts shapes.
fn api_history(session: &Session) -> Vec<ApiMessage> {
    session
        .messages
        .iter()
        .filter_map(|m| m.normalize())
        .map(|(role, text)| ApiMessage::new(role, text))
        .collect()
}

fn api_history_tail(session: &Session, limit: usize) -> Vec<ApiMessage> {
    let mut history = api_history(session);
    if history.len() > limit {
        history.drain(..history.len() - limit);
    }
    history
}

fn fallback_summary(session: &Session, provider_id: &str, model_id: &str) -> Value {
    let count = session.messages.len();
    json!({
        "summary": format!(
            "Session '{}' contains {} messages. (LLM summary unavailable)",
            session.title, count
        ),
        "messageCount": count,
        "provider": provider_id,
        "model": model_id,
    })
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
