//! Tool-call dialect codecs.
//!
//! Two encodings convey tool calls on the wire:
//!
//! - **native** — OpenAI-style `tool_calls` / legacy `function_call` JSON
//!   in the response message, `tools` + `tool_choice` in the request.
//! - **xml** — the model emits `<tool_call><name>…</name><args>…</args>
//!   </tool_call>` blocks in plain text, instructed by the system prompt.
//!
//! The XML parser is deliberately shallow and hand-rolled: models routinely
//! put unescaped tag-shaped content inside `<content>`, which a conforming
//! XML parser would reject. Only first-level children of `<args>` are
//! treated as arguments; everything inside them is data.

use serde_json::{Map, Value};

use crate::config::CustomLLMService;
use crate::llm::errors::LlmError;
use crate::tools::{ToolCall, ToolResult};

/// The tool-call encoding negotiated for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Native,
    Xml,
}

/// Pick the dialect for a service.
///
/// Anthropic endpoints always use xml, even when configured `native`.
/// `auto` (or unset) resolves to native only for the openai family.
pub fn resolve_dialect(service: &CustomLLMService) -> Dialect {
    match service.tool_calling.trim().to_lowercase().as_str() {
        "native" => {
            if service.provider == "anthropic" {
                Dialect::Xml
            } else {
                Dialect::Native
            }
        }
        "xml" => Dialect::Xml,
        _ => {
            if service.provider == "openai" {
                Dialect::Native
            } else {
                Dialect::Xml
            }
        }
    }
}

// ─── Native Decode ──────────────────────────────────────────────────────────

/// Parse native tool calls out of a response `message` object.
///
/// Returns the parsed calls plus the provider's raw call values (echoed
/// back into the conversation). `arguments` may arrive as a JSON string,
/// an object, or be absent — all three are accepted. When `tool_calls` is
/// missing, a legacy `function_call` maps to a single id-less call.
pub fn parse_native_tool_calls(
    message: &Value,
) -> Result<(Vec<ToolCall>, Vec<Value>), LlmError> {
    if let Some(raw) = message.get("tool_calls").filter(|v| !v.is_null()) {
        let Some(items) = raw.as_array() else {
            return Ok((Vec::new(), Vec::new()));
        };

        let mut calls = Vec::new();
        let mut raw_calls = Vec::new();
        for item in items {
            let Some(obj) = item.as_object() else { continue };
            raw_calls.push(item.clone());

            let id = obj.get("id").and_then(Value::as_str).unwrap_or_default();
            let function = obj.get("function").and_then(Value::as_object);
            let name = function
                .and_then(|f| f.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            if name.trim().is_empty() {
                continue;
            }

            let args = parse_arguments_value(
                name,
                function.and_then(|f| f.get("arguments")),
            )?;
            calls.push(ToolCall {
                id: id.to_string(),
                name: name.to_string(),
                args,
            });
        }
        return Ok((calls, raw_calls));
    }

    if let Some(fc) = message.get("function_call").and_then(Value::as_object) {
        let name = fc.get("name").and_then(Value::as_str).unwrap_or_default();
        if name.trim().is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }
        let args = parse_arguments_value(name, fc.get("arguments"))?;
        let raw = Value::Object(Map::from_iter([(
            "function_call".to_string(),
            Value::Object(fc.clone()),
        )]));
        return Ok((
            vec![ToolCall {
                id: String::new(),
                name: name.to_string(),
                args,
            }],
            vec![raw],
        ));
    }

    Ok((Vec::new(), Vec::new()))
}

/// Accept `arguments` as string, object, nil, or anything JSON-encodable.
fn parse_arguments_value(
    name: &str,
    arguments: Option<&Value>,
) -> Result<Map<String, Value>, LlmError> {
    match arguments {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::String(s)) => {
            if s.trim().is_empty() {
                return Ok(Map::new());
            }
            serde_json::from_str::<Map<String, Value>>(s).map_err(|e| LlmError::Parse {
                reason: format!("failed to parse tool arguments for {name}: {e}"),
            })
        }
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => {
            // Unusual but harmless: round-trip through JSON text.
            let text = other.to_string();
            Ok(serde_json::from_str::<Map<String, Value>>(&text).unwrap_or_default())
        }
    }
}

// ─── XML Decode ─────────────────────────────────────────────────────────────

/// Extract every `<tool_call>` block from assistant text.
pub fn parse_xml_tool_calls(text: &str) -> Result<Vec<ToolCall>, LlmError> {
    let blocks = extract_tool_call_blocks(text);
    let mut calls = Vec::with_capacity(blocks.len());
    for block in blocks {
        calls.push(parse_tool_call_block(block)?);
    }
    Ok(calls)
}

/// Outermost `<tool_call>…</tool_call>` pairs; nested tool-like tags inside
/// `<args>` are user data, not block boundaries.
fn extract_tool_call_blocks(text: &str) -> Vec<&str> {
    const OPEN: &str = "<tool_call>";
    const CLOSE: &str = "</tool_call>";

    let mut blocks = Vec::new();
    let mut search_from = 0;
    while let Some(start) = text[search_from..].find(OPEN) {
        let start = search_from + start;
        let Some(end) = text[start..].find(CLOSE) else {
            break;
        };
        let end = start + end + CLOSE.len();
        blocks.push(&text[start..end]);
        search_from = end;
    }
    blocks
}

fn parse_tool_call_block(block: &str) -> Result<ToolCall, LlmError> {
    let inner = extract_tag_inner(block, "tool_call").ok_or_else(|| LlmError::Parse {
        reason: "invalid tool_call block".to_string(),
    })?;
    let name = extract_tag_inner(inner, "name")
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| LlmError::Parse {
            reason: "missing tool name".to_string(),
        })?;

    let args_inner = extract_tag_inner(inner, "args").unwrap_or("");
    let mut args = Map::new();
    for (key, value) in parse_args_first_level(args_inner) {
        args.insert(key, Value::String(value));
    }

    Ok(ToolCall {
        id: String::new(),
        name: name.to_string(),
        args,
    })
}

/// Parse only first-level children of `<args>` as a flat string map.
///
/// Values are taken verbatim up to the matching close tag, so they may
/// contain nested tags; CDATA sections are unwrapped.
fn parse_args_first_level(args_inner: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut i = 0;
    while let Some(open_start) = args_inner[i..].find('<') {
        let open_start = i + open_start;
        if open_start + 1 >= args_inner.len() {
            break;
        }
        if args_inner.as_bytes()[open_start + 1] == b'/' {
            i = open_start + 2;
            continue;
        }
        let Some(open_end) = args_inner[open_start..].find('>') else {
            break;
        };
        let open_end = open_start + open_end;

        let mut tag_name = args_inner[open_start + 1..open_end].trim();
        if let Some(sp) = tag_name.find(char::is_whitespace) {
            tag_name = &tag_name[..sp];
        }
        if tag_name.is_empty() {
            i = open_end + 1;
            continue;
        }

        let close = format!("</{tag_name}>");
        let Some(close_start) = args_inner[open_end + 1..].find(&close) else {
            break;
        };
        let close_start = open_end + 1 + close_start;
        let value = &args_inner[open_end + 1..close_start];
        out.push((tag_name.to_string(), unwrap_cdata(value)));
        i = close_start + close.len();
    }
    out
}

/// Unwrap a `<![CDATA[…]]>` section; anything else passes through.
fn unwrap_cdata(value: &str) -> String {
    let trimmed = value.trim();
    if let Some(rest) = trimmed.strip_prefix("<![CDATA[") {
        if let Some(inner) = rest.strip_suffix("]]>") {
            return inner.to_string();
        }
    }
    value.to_string()
}

fn extract_tag_inner<'a>(s: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = s.find(&open)? + open.len();
    let end = start + s[start..].find(&close)?;
    Some(&s[start..end])
}

// ─── Transcript Builders ────────────────────────────────────────────────────

/// Render native tool calls as the XML transcript shown to the user.
pub fn build_tool_call_transcript_xml(calls: &[ToolCall]) -> String {
    let mut out = String::new();
    for (i, call) in calls.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str("<tool_call>\n  <name>");
        out.push_str(&xml_escape(call.name.trim()));
        out.push_str("</name>\n  <args>\n");

        let mut keys: Vec<&String> = call.args.keys().collect();
        keys.sort();
        for key in keys {
            let value = arg_to_string(&call.args[key]);
            out.push_str("    <");
            out.push_str(&xml_escape(key));
            out.push('>');
            if value.contains(['<', '>', '&']) {
                out.push_str("<![CDATA[");
                out.push_str(&value.replace("]]>", "]]]]><![CDATA[>"));
                out.push_str("]]>");
            } else {
                out.push_str(&xml_escape(&value));
            }
            out.push_str("</");
            out.push_str(&xml_escape(key));
            out.push_str(">\n");
        }
        out.push_str("  </args>\n</tool_call>");
    }
    out
}

/// Render executed tool results as the step transcript shown to the user.
pub fn build_tool_results_transcript(results: &[ToolResult]) -> String {
    let parts: Vec<String> = results
        .iter()
        .map(|r| {
            format!(
                "STEP: execute_tool\nname: {}\ncall_id: {}\nresult:\n{}",
                r.name, r.tool_call_id, r.content
            )
        })
        .collect();
    parts.join("\n---\n")
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Stringify an argument value the way it reads best in a transcript.
fn arg_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service(provider: &str, tool_calling: &str) -> CustomLLMService {
        CustomLLMService {
            provider: provider.to_string(),
            tool_calling: tool_calling.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_dialect_selection_matrix() {
        assert_eq!(resolve_dialect(&service("openai", "native")), Dialect::Native);
        assert_eq!(resolve_dialect(&service("anthropic", "native")), Dialect::Xml);
        assert_eq!(resolve_dialect(&service("openai", "xml")), Dialect::Xml);
        assert_eq!(resolve_dialect(&service("openai", "auto")), Dialect::Native);
        assert_eq!(resolve_dialect(&service("openai", "")), Dialect::Native);
        assert_eq!(resolve_dialect(&service("ollama", "")), Dialect::Xml);
        assert_eq!(resolve_dialect(&service("other", "auto")), Dialect::Xml);
        assert_eq!(resolve_dialect(&service("ollama", "NATIVE")), Dialect::Native);
    }

    #[test]
    fn test_parse_native_tool_calls_string_arguments() {
        let message = json!({
            "tool_calls": [{
                "id": "call_1",
                "function": { "name": "read_file", "arguments": "{\"path\":\"a.txt\"}" },
            }],
        });
        let (calls, raw) = parse_native_tool_calls(&message).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].args["path"], "a.txt");
    }

    #[test]
    fn test_parse_native_tool_calls_object_arguments() {
        let message = json!({
            "tool_calls": [{
                "id": "call_2",
                "function": { "name": "search_files", "arguments": {"query": "main"} },
            }],
        });
        let (calls, _) = parse_native_tool_calls(&message).unwrap();
        assert_eq!(calls[0].args["query"], "main");
    }

    #[test]
    fn test_parse_native_tool_calls_nil_arguments() {
        let message = json!({
            "tool_calls": [{
                "id": "c", "function": { "name": "git_status", "arguments": null },
            }],
        });
        let (calls, _) = parse_native_tool_calls(&message).unwrap();
        assert!(calls[0].args.is_empty());
    }

    #[test]
    fn test_parse_native_skips_nameless_entries() {
        let message = json!({
            "tool_calls": [{ "id": "c", "function": { "arguments": "{}" } }],
        });
        let (calls, raw) = parse_native_tool_calls(&message).unwrap();
        assert!(calls.is_empty());
        assert_eq!(raw.len(), 1);
    }

    #[test]
    fn test_parse_native_bad_arguments_json_is_error() {
        let message = json!({
            "tool_calls": [{
                "id": "c", "function": { "name": "read_file", "arguments": "{broken" },
            }],
        });
        assert!(parse_native_tool_calls(&message).is_err());
    }

    #[test]
    fn test_parse_native_legacy_function_call() {
        let message = json!({
            "function_call": { "name": "git_diff", "arguments": "{\"staged\":true}" },
        });
        let (calls, raw) = parse_native_tool_calls(&message).unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].id.is_empty());
        assert_eq!(calls[0].name, "git_diff");
        assert_eq!(calls[0].args["staged"], true);
        assert!(raw[0].get("function_call").is_some());
    }

    #[test]
    fn test_parse_native_no_calls() {
        let (calls, raw) = parse_native_tool_calls(&json!({"content": "hi"})).unwrap();
        assert!(calls.is_empty());
        assert!(raw.is_empty());
    }

    #[test]
    fn test_parse_xml_basic_block() {
        let text = "<tool_call>\n  <name>read_file</name>\n  <args>\n    <path>README.md</path>\n  </args>\n</tool_call>";
        let calls = parse_xml_tool_calls(text).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].args["path"], "README.md");
    }

    #[test]
    fn test_parse_xml_content_contains_tags() {
        let text = "<tool_call><name>save_file</name><args><path>a.txt</path><content>hello <b>world</b></content></args></tool_call>";
        let calls = parse_xml_tool_calls(text).unwrap();
        assert_eq!(calls[0].name, "save_file");
        assert_eq!(calls[0].args["path"], "a.txt");
        assert_eq!(calls[0].args["content"], "hello <b>world</b>");
    }

    #[test]
    fn test_parse_xml_multiple_blocks() {
        let text = "hello\n<tool_call><name>search_files</name><args><query>main</query></args></tool_call>\n<tool_call><name>git_status</name><args></args></tool_call>";
        let calls = parse_xml_tool_calls(text).unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "search_files");
        assert_eq!(calls[1].name, "git_status");
        assert!(calls[1].args.is_empty());
    }

    #[test]
    fn test_parse_xml_cdata_unwrapped() {
        let text = "<tool_call><name>save_file</name><args><path>x</path><content><![CDATA[if (a < b) {}]]></content></args></tool_call>";
        let calls = parse_xml_tool_calls(text).unwrap();
        assert_eq!(calls[0].args["content"], "if (a < b) {}");
    }

    #[test]
    fn test_parse_xml_missing_name_is_error() {
        let text = "<tool_call><args><path>x</path></args></tool_call>";
        assert!(parse_xml_tool_calls(text).is_err());
    }

    #[test]
    fn test_parse_xml_no_blocks() {
        assert!(parse_xml_tool_calls("plain answer").unwrap().is_empty());
    }

    #[test]
    fn test_transcript_xml_sorted_args_and_cdata() {
        let mut args = Map::new();
        args.insert("path".to_string(), json!("a.txt"));
        args.insert("content".to_string(), json!("x < y"));
        let calls = vec![ToolCall {
            id: "c1".to_string(),
            name: "save_file".to_string(),
            args,
        }];

        let xml = build_tool_call_transcript_xml(&calls);
        assert!(xml.contains("<name>save_file</name>"));
        // args render in sorted order: content before path
        let content_pos = xml.find("<content>").unwrap();
        let path_pos = xml.find("<path>").unwrap();
        assert!(content_pos < path_pos);
        assert!(xml.contains("<![CDATA[x < y]]>"));

        // Transcript round-trips through the XML parser.
        let parsed = parse_xml_tool_calls(&xml).unwrap();
        assert_eq!(parsed[0].args["content"], "x < y");
    }

    #[test]
    fn test_results_transcript_shape() {
        let results = vec![ToolResult {
            tool_call_id: "c1".to_string(),
            name: "read_file".to_string(),
            content: "data".to_string(),
            is_error: false,
        }];
        let transcript = build_tool_results_transcript(&results);
        assert!(transcript.starts_with("STEP: execute_tool"));
        assert!(transcript.contains("name: read_file"));
        assert!(transcript.contains("call_id: c1"));
        assert!(transcript.contains("result:\ndata"));
    }
}
