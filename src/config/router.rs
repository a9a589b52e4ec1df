//! ProviderRouter — resolves an opaque model identifier to a service.
//!
//! Model identifiers arrive as `provider::model` (preferred), the older
//! `provider:model`, or a bare model name. Resolution walks the enabled
//! custom services first, then the legacy `providers` table (synthesizing
//! a service descriptor on the fly), and finally falls back to the mock
//! sentinel — the ground-truth unconfigured behavior. That order is part
//! of the contract and must not change.

use serde_json::Value;

use super::store::custom_services_of;
use super::types::CustomLLMService;

/// Where a model identifier resolved to.
#[derive(Debug, Clone)]
pub enum RouteTarget {
    /// A concrete service and the model name to send it.
    Service {
        service: CustomLLMService,
        model: String,
    },
    /// Nothing matched; answer with the built-in mock response.
    Mock,
}

/// Split `provider::model` / `provider:model` into its halves.
///
/// Both halves must be non-blank for the split to count; otherwise the
/// whole string is treated as a bare model name.
pub fn split_provider_model(model: &str) -> (Option<&str>, &str) {
    for sep in ["::", ":"] {
        if let Some((provider, rest)) = model.split_once(sep) {
            if !provider.trim().is_empty() && !rest.trim().is_empty() {
                return (Some(provider), rest);
            }
        }
    }
    (None, model)
}

/// Resolve a model identifier against a config snapshot.
pub fn resolve(config: &Value, model: &str) -> RouteTarget {
    let (provider_id, model_id) = split_provider_model(model);

    // 1. Custom services: enabled only, provider id must match when given,
    //    model must be advertised (model list or default). First match wins.
    for service in custom_services_of(config) {
        if !service.enabled {
            continue;
        }
        if let Some(pid) = provider_id {
            if service.id != pid {
                continue;
            }
        }
        if service.advertises(model_id) {
            return RouteTarget::Service {
                service,
                model: model_id.to_string(),
            };
        }
    }

    // 2. Legacy providers table.
    if let Some(providers) = config.get("providers").and_then(Value::as_object) {
        if let Some(pid) = provider_id {
            if let Some(entry) = providers.get(pid).and_then(Value::as_object) {
                if entry.get("model").and_then(Value::as_str) == Some(model_id) {
                    return RouteTarget::Service {
                        service: synthesize_service(pid, entry),
                        model: model_id.to_string(),
                    };
                }
            }
        } else {
            for (id, entry) in providers {
                let Some(entry) = entry.as_object() else {
                    continue;
                };
                if entry.get("model").and_then(Value::as_str) == Some(model_id) {
                    return RouteTarget::Service {
                        service: synthesize_service(id, entry),
                        model: model_id.to_string(),
                    };
                }
            }
        }
    }

    // 3. Nothing configured for this model.
    RouteTarget::Mock
}

/// Build a service descriptor from a legacy `providers` entry.
///
/// The canonical OpenAI/Anthropic endpoints are assumed when the entry has
/// no base_url and the provider id names one of them.
fn synthesize_service(
    provider_id: &str,
    entry: &serde_json::Map<String, Value>,
) -> CustomLLMService {
    let mut base_url = entry
        .get("base_url")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if base_url.is_empty() {
        let lower = provider_id.to_lowercase();
        if lower.contains("openai") {
            base_url = "https://api.openai.com/v1/chat/completions".to_string();
        } else if lower.contains("anthropic") {
            base_url = "https://api.anthropic.com/v1/messages".to_string();
        }
    }

    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(provider_id);

    CustomLLMService {
        id: provider_id.to_string(),
        name: name.to_string(),
        base_url,
        api_key: entry
            .get("api_key")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        default_model: entry
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        auth_type: "bearer".to_string(),
        enabled: true,
        ..Default::default()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_service(service: Value) -> Value {
        json!({ "customServices": [service] })
    }

    #[test]
    fn test_split_double_colon_preferred() {
        assert_eq!(split_provider_model("svc::gpt-4"), (Some("svc"), "gpt-4"));
    }

    #[test]
    fn test_split_single_colon_tolerated() {
        assert_eq!(split_provider_model("svc:gpt-4"), (Some("svc"), "gpt-4"));
    }

    #[test]
    fn test_split_bare_model() {
        assert_eq!(split_provider_model("gpt-4"), (None, "gpt-4"));
    }

    #[test]
    fn test_split_blank_half_is_bare() {
        assert_eq!(split_provider_model("::gpt-4"), (None, "::gpt-4"));
    }

    #[test]
    fn test_resolve_custom_service_by_model_list() {
        let config = config_with_service(json!({
            "id": "svc", "enabled": true, "models": ["m1"], "defaultModel": "m0",
        }));
        match resolve(&config, "m1") {
            RouteTarget::Service { service, model } => {
                assert_eq!(service.id, "svc");
                assert_eq!(model, "m1");
            }
            RouteTarget::Mock => panic!("expected service"),
        }
    }

    #[test]
    fn test_resolve_custom_service_by_default_model() {
        let config = config_with_service(json!({
            "id": "svc", "enabled": true, "defaultModel": "m0",
        }));
        assert!(matches!(
            resolve(&config, "svc::m0"),
            RouteTarget::Service { .. }
        ));
        // Bare model names route by defaultModel too.
        assert!(matches!(resolve(&config, "m0"), RouteTarget::Service { .. }));
    }

    #[test]
    fn test_resolve_skips_disabled_service() {
        let config = config_with_service(json!({
            "id": "svc", "enabled": false, "models": ["m1"],
        }));
        assert!(matches!(resolve(&config, "m1"), RouteTarget::Mock));
    }

    #[test]
    fn test_resolve_provider_id_must_match() {
        let config = config_with_service(json!({
            "id": "svc", "enabled": true, "models": ["m1"],
        }));
        assert!(matches!(
            resolve(&config, "other::m1"),
            RouteTarget::Mock
        ));
    }

    #[test]
    fn test_custom_services_win_over_legacy() {
        let config = json!({
            "customServices": [
                {"id": "svc", "enabled": true, "models": ["m1"], "baseUrl": "http://svc"},
            ],
            "providers": {
                "legacy": {"model": "m1", "base_url": "http://legacy"},
            },
        });
        match resolve(&config, "m1") {
            RouteTarget::Service { service, .. } => assert_eq!(service.id, "svc"),
            RouteTarget::Mock => panic!("expected service"),
        }
    }

    #[test]
    fn test_resolve_legacy_provider_synthesizes_service() {
        let config = json!({
            "providers": {
                "my-openai": {"model": "gpt-4", "api_key": "sk-1"},
            },
        });
        match resolve(&config, "my-openai::gpt-4") {
            RouteTarget::Service { service, model } => {
                assert_eq!(model, "gpt-4");
                assert_eq!(service.auth_type, "bearer");
                assert!(service.enabled);
                assert_eq!(
                    service.base_url,
                    "https://api.openai.com/v1/chat/completions"
                );
            }
            RouteTarget::Mock => panic!("expected service"),
        }
    }

    #[test]
    fn test_resolve_legacy_anthropic_endpoint_default() {
        let config = json!({
            "providers": { "Anthropic-main": {"model": "claude-x"} },
        });
        match resolve(&config, "claude-x") {
            RouteTarget::Service { service, .. } => {
                assert_eq!(service.base_url, "https://api.anthropic.com/v1/messages");
            }
            RouteTarget::Mock => panic!("expected service"),
        }
    }

    #[test]
    fn test_resolve_unmatched_is_mock() {
        assert!(matches!(resolve(&json!({}), "nope"), RouteTarget::Mock));
    }
}
