//! TurnLoop — the bounded request/response/execute machine.
//!
//! One iteration: check cancellation, send the provider-shaped request,
//! record the audit turn, parse, dispatch any tool calls, extend the
//! conversation with the dialect's frames, repeat. Terminates on a turn
//! with no tool calls, on the turn bound (no error), on cancellation, or
//! on an unrecoverable provider error. Errors still carry the text and
//! audit trail accumulated so far.

use thiserror::Error;

use super::client::{empty_response_detail, LlmClient};
use super::context::prepare_messages;
use super::dialect::{
    build_tool_call_transcript_xml, build_tool_results_transcript, parse_native_tool_calls,
    parse_xml_tool_calls, resolve_dialect, Dialect,
};
use super::errors::LlmError;
use super::types::ApiMessage;
use crate::config::CustomLLMService;
use crate::session::RawTurn;
use crate::tools::{ToolCtx, ToolRegistry, ToolResult};

/// Upper bound on provider round-trips per message.
pub const MAX_TURNS: usize = 10;

/// Successful loop completion.
#[derive(Debug)]
pub struct TurnLoopOutput {
    /// Accumulated visible text, turns separated by a blank line.
    pub text: String,
    /// One audit record per request sent, in order.
    pub raw_turns: Vec<RawTurn>,
}

/// Loop failure, carrying whatever had accumulated before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct TurnLoopError {
    pub error: LlmError,
    pub text: String,
    pub raw_turns: Vec<RawTurn>,
}

/// Drive the tool-use loop to completion.
#[allow(clippy::too_many_arguments)]
pub async fn run_tool_loop(
    client: &LlmClient,
    registry: &ToolRegistry,
    tool_ctx: &ToolCtx,
    session_id: &str,
    service: &CustomLLMService,
    model: &str,
    initial_messages: Vec<ApiMessage>,
    plan_mode: bool,
) -> Result<TurnLoopOutput, TurnLoopError> {
    let dialect = resolve_dialect(service);
    let mut messages =
        prepare_messages(&initial_messages, service.context_limit.unwrap_or(0));
    let tools = match dialect {
        Dialect::Native => Some(registry.openai_tools()),
        Dialect::Xml => None,
    };

    let mut builder = String::new();
    let mut raw_turns: Vec<RawTurn> = Vec::new();

    let fail = |error: LlmError, builder: &str, raw_turns: &[RawTurn]| TurnLoopError {
        error,
        text: builder.to_string(),
        raw_turns: raw_turns.to_vec(),
    };

    for turn in 0..MAX_TURNS {
        if tool_ctx.cancel.is_cancelled() {
            return Err(fail(LlmError::Cancelled, &builder, &raw_turns));
        }

        tracing::info!(
            session_id = %session_id,
            turn = turn,
            message_count = messages.len(),
            "turn loop round"
        );

        let http_turn = client
            .call(service, model, &messages, tools.as_deref(), &tool_ctx.cancel)
            .await
            .map_err(|e| fail(e, &builder, &raw_turns))?;
        raw_turns.push(http_turn.raw_turn.clone());

        let parsed = client
            .parse(service, &http_turn)
            .map_err(|e| fail(e, &builder, &raw_turns))?;

        // Native tool calls live in the response message object.
        let (native_calls, raw_native_calls) = match (dialect, &parsed.message) {
            (Dialect::Native, Some(message)) => parse_native_tool_calls(message)
                .map_err(|e| fail(e, &builder, &raw_turns))?,
            _ => (Vec::new(), Vec::new()),
        };

        if parsed.text.is_empty() && native_calls.is_empty() {
            return Err(fail(
                LlmError::EmptyResponse {
                    provider: service.provider.clone(),
                    detail: empty_response_detail(&http_turn.raw_turn),
                },
                &builder,
                &raw_turns,
            ));
        }

        if !parsed.text.is_empty() {
            if !builder.is_empty() {
                builder.push_str("\n\n");
            }
            builder.push_str(&parsed.text);
        }

        if !native_calls.is_empty() {
            // UI echo of what the model asked for, then the wire frames.
            if !builder.is_empty() {
                builder.push_str("\n\n");
            }
            builder.push_str(&build_tool_call_transcript_xml(&native_calls));

            messages.push(ApiMessage::assistant_with_calls(
                parsed.text.clone(),
                serde_json::Value::Array(raw_native_calls),
            ));

            let results =
                dispatch_calls(registry, tool_ctx, session_id, native_calls, plan_mode).await;
            for result in &results {
                messages.push(ApiMessage::tool_result(
                    result.tool_call_id.clone(),
                    result.content.clone(),
                ));
            }

            builder.push_str("\n\n<tool_results>\n");
            builder.push_str(&build_tool_results_transcript(&results));
            builder.push_str("\n</tool_results>");
            continue;
        }

        // XML branch: tool calls are embedded in the assistant text.
        let xml_calls =
            parse_xml_tool_calls(&parsed.text).map_err(|e| fail(e, &builder, &raw_turns))?;
        if xml_calls.is_empty() {
            return Ok(TurnLoopOutput {
                text: builder,
                raw_turns,
            });
        }

        messages.push(ApiMessage::new("assistant", parsed.text.clone()));

        let results =
            dispatch_calls(registry, tool_ctx, session_id, xml_calls, plan_mode).await;
        let joined = results
            .iter()
            .map(|r| format!("Tool: {}\nResult: {}", r.name, r.content))
            .collect::<Vec<_>>()
            .join("\n---\n");

        builder.push_str("\n\n<tool_results>\n");
        builder.push_str(&joined);
        builder.push_str("\n</tool_results>");

        messages.push(ApiMessage::new(
            "user",
            format!("Tool Results:\n{joined}\n\nPlease continue."),
        ));
    }

    // Turn bound reached: return what accumulated, not an error.
    tracing::warn!(session_id = %session_id, max_turns = MAX_TURNS, "turn bound reached");
    Ok(TurnLoopOutput {
        text: builder,
        raw_turns,
    })
}

/// Execute tool calls sequentially (the model expects ordered results).
async fn dispatch_calls(
    registry: &ToolRegistry,
    tool_ctx: &ToolCtx,
    session_id: &str,
    calls: Vec<crate::tools::ToolCall>,
    plan_mode: bool,
) -> Vec<ToolResult> {
    let mut results = Vec::with_capacity(calls.len());
    for call in calls {
        results.push(
            registry
                .execute_tool_call(tool_ctx, session_id, call, plan_mode)
                .await,
        );
    }
    results
}
