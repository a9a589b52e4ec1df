//! ConfigStore — the mutable configuration document.
//!
//! The document is arbitrary nested JSON with two conventional top-level
//! keys: `providers` (object keyed by provider id) and `customServices`
//! (list of service descriptors). Only full-document replacement is
//! supported; a writer lock serializes updates and readers take snapshots.
//! The document is mirrored to `config.json` on every change.

use std::path::PathBuf;
use std::sync::RwLock;

use serde_json::{json, Value};

use super::errors::ConfigError;
use super::types::CustomLLMService;
use crate::paths::DataPaths;

pub struct ConfigStore {
    config: RwLock<Value>,
    file: PathBuf,
}

impl ConfigStore {
    /// Open the store, loading `config.json` when present.
    ///
    /// A missing file seeds the default document; a malformed one is logged
    /// and replaced by an empty document (the UI can resend its config).
    pub fn open(paths: &DataPaths) -> Self {
        let file = paths.config_file();
        let config = match std::fs::read_to_string(&file) {
            Ok(data) => match serde_json::from_str::<Value>(&data) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(file = %file.display(), error = %e, "failed to parse config file");
                    json!({})
                }
            },
            Err(_) => json!({
                "providers": {
                    "openspace": { "apiKey": "public" }
                }
            }),
        };

        Self {
            config: RwLock::new(config),
            file,
        }
    }

    /// A point-in-time copy of the whole document.
    pub fn snapshot(&self) -> Value {
        self.config.read().expect("config lock poisoned").clone()
    }

    /// Replace the whole document and mirror it to disk.
    ///
    /// The disk write happens before the in-memory swap; a failed write
    /// leaves the previous document in effect.
    pub fn replace(&self, doc: Value) -> Result<Value, ConfigError> {
        let mut config = self.config.write().expect("config lock poisoned");
        let data = serde_json::to_string_pretty(&doc).map_err(|e| ConfigError::InvalidJson {
            reason: e.to_string(),
        })?;
        std::fs::write(&self.file, data)?;
        *config = doc.clone();
        Ok(doc)
    }

    /// Parse and apply a full-document replacement sent as a JSON string.
    pub fn update_from_str(&self, config_data: &str) -> Result<Value, ConfigError> {
        let doc: Value =
            serde_json::from_str(config_data).map_err(|e| ConfigError::InvalidJson {
                reason: e.to_string(),
            })?;
        self.replace(doc)
    }

    // ─── Custom Services ────────────────────────────────────────────────

    /// Decode `customServices`, skipping entries that fail to decode.
    ///
    /// Migration tolerance: the UI may send untyped entries; a field
    /// mismatch skips that entry, never fails the document.
    pub fn custom_services(&self) -> Vec<CustomLLMService> {
        let config = self.config.read().expect("config lock poisoned");
        custom_services_of(&config)
    }

    /// Add a service described by a JSON payload.
    pub fn add_service(&self, config_data: &str) -> Result<CustomLLMService, ConfigError> {
        let service: CustomLLMService =
            serde_json::from_str(config_data).map_err(|e| ConfigError::InvalidJson {
                reason: e.to_string(),
            })?;
        validate_service(&service)?;

        let mut config = self.config.write().expect("config lock poisoned");
        let services = services_array_mut(&mut config);
        let duplicate = services.iter().any(|svc| {
            svc.get("id").and_then(Value::as_str) == Some(service.id.as_str())
        });
        if duplicate {
            return Err(ConfigError::Validation {
                reason: format!("service with ID '{}' already exists", service.id),
            });
        }

        let entry = serde_json::to_value(&service).map_err(|e| ConfigError::InvalidJson {
            reason: e.to_string(),
        })?;
        services.push(entry);
        self.save_locked(&config)?;
        Ok(service)
    }

    /// Update an existing service in place.
    pub fn update_service(
        &self,
        service_id: &str,
        config_data: &str,
    ) -> Result<CustomLLMService, ConfigError> {
        let service: CustomLLMService =
            serde_json::from_str(config_data).map_err(|e| ConfigError::InvalidJson {
                reason: e.to_string(),
            })?;
        if service.id != service_id {
            return Err(ConfigError::Validation {
                reason: "service ID mismatch".to_string(),
            });
        }
        validate_service(&service)?;

        let mut config = self.config.write().expect("config lock poisoned");
        let services = services_array_mut(&mut config);
        let slot = services
            .iter_mut()
            .find(|svc| svc.get("id").and_then(Value::as_str) == Some(service_id))
            .ok_or_else(|| ConfigError::ServiceNotFound {
                service_id: service_id.to_string(),
            })?;

        *slot = serde_json::to_value(&service).map_err(|e| ConfigError::InvalidJson {
            reason: e.to_string(),
        })?;
        self.save_locked(&config)?;
        Ok(service)
    }

    /// Remove a service by id.
    pub fn delete_service(&self, service_id: &str) -> Result<(), ConfigError> {
        let mut config = self.config.write().expect("config lock poisoned");
        let services = services_array_mut(&mut config);
        let before = services.len();
        services.retain(|svc| svc.get("id").and_then(Value::as_str) != Some(service_id));
        if services.len() == before {
            return Err(ConfigError::ServiceNotFound {
                service_id: service_id.to_string(),
            });
        }
        self.save_locked(&config)?;
        Ok(())
    }

    /// Mirror the document to disk. Caller holds the write lock.
    fn save_locked(&self, config: &Value) -> Result<(), ConfigError> {
        let data = serde_json::to_string_pretty(config).map_err(|e| ConfigError::InvalidJson {
            reason: e.to_string(),
        })?;
        std::fs::write(&self.file, data)?;
        Ok(())
    }

    // ─── Provider Listing ───────────────────────────────────────────────

    /// The provider/model catalog shown by the model picker: legacy
    /// `providers` entries first, then enabled custom services, with a
    /// per-provider default-model map. Falls back to the built-in
    /// OpenSpace Zen entry when nothing is configured.
    pub fn providers_payload(&self) -> Value {
        let config = self.config.read().expect("config lock poisoned");

        let mut providers: Vec<Value> = Vec::new();
        let mut default_map = serde_json::Map::new();

        if let Some(map) = config.get("providers").and_then(Value::as_object) {
            for (provider_id, provider_config) in map {
                let Some(data) = provider_config.as_object() else {
                    continue;
                };
                let model = data
                    .get("model")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if model.is_empty() {
                    continue;
                }

                let name = data
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or(provider_id);
                providers.push(json!({
                    "id": provider_id,
                    "name": name,
                    "models": { model: { "id": model, "name": model } },
                }));
                default_map.insert(provider_id.clone(), json!(model));
            }
        }

        for service in custom_services_of(&config) {
            if !service.enabled {
                continue;
            }
            let mut models = serde_json::Map::new();
            for m in &service.models {
                models.insert(m.clone(), json!({ "id": m, "name": m }));
            }
            if !service.default_model.is_empty() {
                models
                    .entry(service.default_model.clone())
                    .or_insert_with(|| {
                        json!({ "id": service.default_model, "name": service.default_model })
                    });
            }
            if models.is_empty() {
                continue;
            }

            providers.push(json!({
                "id": service.id,
                "name": service.name,
                "models": models,
            }));
            if !service.default_model.is_empty() {
                default_map.insert(service.id.clone(), json!(service.default_model));
            }
        }

        if providers.is_empty() {
            return json!({
                "providers": [{
                    "id": "openspace",
                    "name": "OpenSpace Zen",
                    "models": {
                        "big-pickle": { "id": "big-pickle", "name": "Big Pickle" }
                    },
                }],
                "default": { "openspace": "big-pickle" },
            });
        }

        json!({ "providers": providers, "default": default_map })
    }
}

/// Decode the `customServices` array of a document, skipping bad entries.
pub fn custom_services_of(config: &Value) -> Vec<CustomLLMService> {
    let Some(entries) = config.get("customServices").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut services = Vec::new();
    for entry in entries {
        match serde_json::from_value::<CustomLLMService>(entry.clone()) {
            Ok(svc) => services.push(svc),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed custom service entry");
            }
        }
    }
    services
}

/// The `customServices` array of the document, created when absent.
fn services_array_mut(config: &mut Value) -> &mut Vec<Value> {
    if !config.is_object() {
        *config = json!({});
    }
    let obj = config.as_object_mut().expect("config is an object");
    let entry = obj
        .entry("customServices")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    entry.as_array_mut().expect("customServices is an array")
}

/// Required-field checks shared by add and update.
fn validate_service(service: &CustomLLMService) -> Result<(), ConfigError> {
    if service.id.is_empty() {
        return Err(ConfigError::Validation {
            reason: "service ID is required".to_string(),
        });
    }
    if service.name.is_empty() {
        return Err(ConfigError::Validation {
            reason: "service name is required".to_string(),
        });
    }
    if service.base_url.is_empty() {
        return Err(ConfigError::Validation {
            reason: "base URL is required".to_string(),
        });
    }
    if service.default_model.is_empty() {
        return Err(ConfigError::Validation {
            reason: "default model is required".to_string(),
        });
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, ConfigStore) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DataPaths::at(tmp.path());
        paths.ensure();
        (tmp, ConfigStore::open(&paths))
    }

    fn service_json(id: &str) -> String {
        json!({
            "id": id,
            "name": id,
            "baseUrl": "http://localhost:9999/v1/chat/completions",
            "defaultModel": "test-model",
            "enabled": true,
        })
        .to_string()
    }

    #[test]
    fn test_fresh_store_has_default_providers() {
        let (_tmp, store) = test_store();
        let doc = store.snapshot();
        assert!(doc.get("providers").is_some());
    }

    #[test]
    fn test_replace_persists_document() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = DataPaths::at(tmp.path());
        paths.ensure();

        {
            let store = ConfigStore::open(&paths);
            store
                .update_from_str(r#"{"providers": {"p1": {"model": "m1"}}}"#)
                .unwrap();
        }

        let reopened = ConfigStore::open(&paths);
        assert_eq!(reopened.snapshot()["providers"]["p1"]["model"], "m1");
    }

    #[test]
    fn test_update_rejects_invalid_json() {
        let (_tmp, store) = test_store();
        let err = store.update_from_str("{nope").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidJson { .. }));
    }

    #[test]
    fn test_service_crud() {
        let (_tmp, store) = test_store();

        let added = store.add_service(&service_json("svc1")).unwrap();
        assert_eq!(added.id, "svc1");
        assert_eq!(store.custom_services().len(), 1);

        // Duplicate id rejected
        assert!(store.add_service(&service_json("svc1")).is_err());

        // Update
        let mut payload: Value = serde_json::from_str(&service_json("svc1")).unwrap();
        payload["name"] = json!("renamed");
        store
            .update_service("svc1", &payload.to_string())
            .unwrap();
        assert_eq!(store.custom_services()[0].name, "renamed");

        // Id mismatch rejected
        assert!(store
            .update_service("other", &payload.to_string())
            .is_err());

        // Delete
        store.delete_service("svc1").unwrap();
        assert!(store.custom_services().is_empty());
        assert!(matches!(
            store.delete_service("svc1").unwrap_err(),
            ConfigError::ServiceNotFound { .. }
        ));
    }

    #[test]
    fn test_add_service_validates_required_fields() {
        let (_tmp, store) = test_store();
        let err = store
            .add_service(r#"{"id": "x", "name": "x"}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn test_malformed_entry_skipped_not_fatal() {
        let (_tmp, store) = test_store();
        store
            .replace(json!({
                "customServices": [
                    {"id": "good", "enabled": true, "defaultModel": "m"},
                    {"id": "bad", "models": "not-a-list"},
                ]
            }))
            .unwrap();

        let services = store.custom_services();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].id, "good");
    }

    #[test]
    fn test_providers_payload_fallback() {
        let (_tmp, store) = test_store();
        store.replace(json!({})).unwrap();
        let payload = store.providers_payload();
        assert_eq!(payload["providers"][0]["id"], "openspace");
        assert_eq!(payload["default"]["openspace"], "big-pickle");
    }

    #[test]
    fn test_providers_payload_merges_both_tables() {
        let (_tmp, store) = test_store();
        store
            .replace(json!({
                "providers": {
                    "legacy": { "model": "legacy-model", "name": "Legacy" }
                },
                "customServices": [{
                    "id": "svc",
                    "name": "Svc",
                    "enabled": true,
                    "models": ["m1"],
                    "defaultModel": "m2",
                }, {
                    "id": "disabled-svc",
                    "name": "Off",
                    "enabled": false,
                    "models": ["m3"],
                }]
            }))
            .unwrap();

        let payload = store.providers_payload();
        let ids: Vec<&str> = payload["providers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert!(ids.contains(&"legacy"));
        assert!(ids.contains(&"svc"));
        assert!(!ids.contains(&"disabled-svc"));
        assert_eq!(payload["default"]["legacy"], "legacy-model");
        assert_eq!(payload["default"]["svc"], "m2");

        // defaultModel is folded into the model map even when not listed.
        assert!(payload["providers"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["id"] == "svc")
            .unwrap()["models"]
            .get("m2")
            .is_some());
    }
}
