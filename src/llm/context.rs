//! ContextPreparer — token-budget-driven truncation.
//!
//! Keeps the head (the first message, plus the second when it is cheap)
//! and a greedy tail, dropping the middle with an explicit notice so the
//! model knows history is missing. Tokens are approximated as
//! `content.len() / 4`. Deterministic, never reorders, never mutates.

use super::types::ApiMessage;

/// Budget used when the service declares none.
const DEFAULT_TOKEN_LIMIT: i64 = 100_000;

/// Truncate `messages` to roughly fit `limit` tokens.
pub fn prepare_messages(messages: &[ApiMessage], limit: i64) -> Vec<ApiMessage> {
    let limit = if limit <= 0 { DEFAULT_TOKEN_LIMIT } else { limit };

    let total: i64 = messages.iter().map(ApiMessage::approx_tokens).sum();
    if total <= limit {
        return messages.to_vec();
    }

    // Too few messages to drop anything safely.
    if messages.len() <= 3 {
        return messages.to_vec();
    }

    let mut result: Vec<ApiMessage> = Vec::new();

    // Always keep the first message (task definition / conversation start).
    result.push(messages[0].clone());
    let mut current = messages[0].approx_tokens();

    // Keep the second message when it fits in the first half of the budget.
    if messages.len() > 1 {
        let second = messages[1].approx_tokens();
        if current + second < limit / 2 {
            result.push(messages[1].clone());
            current += second;
        }
    }

    // Greedy tail scan: include from the end while the budget holds, stop
    // at the first message that does not fit.
    let start_index = result.len();
    let mut kept_tail: Vec<ApiMessage> = Vec::new();
    for i in (start_index..messages.len()).rev() {
        let tokens = messages[i].approx_tokens();
        if current + tokens > limit {
            break;
        }
        current += tokens;
        kept_tail.insert(0, messages[i].clone());
    }

    // Anything between head and tail was dropped; say so explicitly.
    let dropped = messages.len() - result.len() - kept_tail.len();
    if dropped > 0 {
        result.push(ApiMessage::new(
            "system",
            format!(
                "[Context Truncation: {dropped} messages from the middle of the conversation \
                 have been removed to fit the token limit. Please focus on the latest messages.]"
            ),
        ));
    }

    result.extend(kept_tail);
    result
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, chars: usize) -> ApiMessage {
        ApiMessage::new(role, "x".repeat(chars))
    }

    #[test]
    fn test_under_budget_unchanged() {
        let messages = vec![msg("user", 40), msg("assistant", 40)];
        let out = prepare_messages(&messages, 1000);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_short_list_never_truncated() {
        // Over budget but ≤ 3 messages: nothing safe to drop.
        let messages = vec![msg("user", 4000), msg("assistant", 4000), msg("user", 4000)];
        let out = prepare_messages(&messages, 10);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_middle_dropped_with_notice() {
        // 10 messages of 100 tokens each, budget 400: head + a few tail
        // messages survive and a truncation notice appears between them.
        let messages: Vec<ApiMessage> = (0..10).map(|_| msg("user", 400)).collect();
        let out = prepare_messages(&messages, 400);

        assert!(out.len() < messages.len());
        let notice = out
            .iter()
            .find(|m| m.role == "system")
            .expect("truncation notice present");
        let text = notice.content.as_deref().unwrap();
        assert!(text.starts_with("[Context Truncation: "));

        // The notice reports the exact number dropped.
        let kept_real = out.len() - 1;
        let dropped = messages.len() - kept_real;
        assert!(text.contains(&format!("{dropped} messages")));
    }

    #[test]
    fn test_keeps_first_and_latest() {
        let mut messages: Vec<ApiMessage> = Vec::new();
        messages.push(ApiMessage::new("user", format!("first {}", "x".repeat(400))));
        for _ in 0..8 {
            messages.push(msg("assistant", 400));
        }
        messages.push(ApiMessage::new("user", format!("last {}", "x".repeat(100))));

        let out = prepare_messages(&messages, 300);
        assert!(out[0].content.as_deref().unwrap().starts_with("first"));
        assert!(out
            .last()
            .unwrap()
            .content
            .as_deref()
            .unwrap()
            .starts_with("last"));
    }

    #[test]
    fn test_second_message_kept_only_when_cheap() {
        // Second message larger than half the budget is not pinned.
        let mut messages = vec![msg("user", 40), msg("assistant", 4000)];
        for _ in 0..6 {
            messages.push(msg("user", 400));
        }
        let out = prepare_messages(&messages, 500);
        // Index 1 (1000 tokens) must not appear right after index 0.
        assert!(out[1].role == "system" || out[1].approx_tokens() <= 250);
    }

    #[test]
    fn test_deterministic() {
        let messages: Vec<ApiMessage> = (0..12).map(|i| msg(if i % 2 == 0 { "user" } else { "assistant" }, 350)).collect();
        let a = prepare_messages(&messages, 500);
        let b = prepare_messages(&messages, 500);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_default_budget_applies_when_unset() {
        let messages: Vec<ApiMessage> = (0..5).map(|_| msg("user", 40)).collect();
        let out = prepare_messages(&messages, 0);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_never_reorders() {
        let messages: Vec<ApiMessage> = (0..10)
            .map(|i| ApiMessage::new("user", format!("{i} {}", "x".repeat(390))))
            .collect();
        let out = prepare_messages(&messages, 500);

        // Surviving original messages keep their relative order.
        let indices: Vec<usize> = out
            .iter()
            .filter_map(|m| {
                m.content
                    .as_deref()
                    .and_then(|c| c.split(' ').next())
                    .and_then(|n| n.parse::<usize>().ok())
            })
            .collect();
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        assert_eq!(indices, sorted);
    }
}
