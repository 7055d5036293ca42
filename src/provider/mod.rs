pub mod gemini;
pub mod openai;
pub mod parse;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::storage::{ACTIVE_PROVIDER_KEY, KeyValueStore, PROVIDER_CONFIGS_KEY, StorageError};

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no usable credentials configured for {provider}")]
    MissingConfiguration { provider: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("empty response from provider")]
    EmptyResponse,
    #[error("could not parse provider response: {0}")]
    Parse(String),
    #[error("provider returned {got} items, expected {expected}")]
    TooFew { got: usize, expected: usize },
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    async fn generate(&self, prompt: &str, count: usize) -> Result<Vec<String>, GenerationError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Google,
    #[serde(rename = "openai")]
    OpenAi,
    Ollama,
}

impl ProviderKind {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "google" | "gemini" => Some(ProviderKind::Google),
            "openai" => Some(ProviderKind::OpenAi),
            "ollama" => Some(ProviderKind::Ollama),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    #[serde(rename = "provider")]
    pub kind: ProviderKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model_name: String,
}

impl ProviderConfig {
    // Starting point for a user-added entry.
    pub fn blank(id: &str) -> Self {
        ProviderConfig {
            id: id.to_string(),
            name: "New Config".into(),
            kind: ProviderKind::OpenAi,
            api_key: String::new(),
            base_url: String::new(),
            model_name: "gpt-3.5-turbo".into(),
        }
    }
}

pub fn default_configs() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            id: "default-gemini".into(),
            name: "Default (Gemini)".into(),
            kind: ProviderKind::Google,
            api_key: String::new(),
            base_url: String::new(),
            model_name: "gemini-2.5-flash".into(),
        },
        ProviderConfig {
            id: "deepseek-example".into(),
            name: "DeepSeek".into(),
            kind: ProviderKind::OpenAi,
            api_key: String::new(),
            base_url: "https://api.deepseek.com".into(),
            model_name: "deepseek-chat".into(),
        },
        ProviderConfig {
            id: "local-ollama".into(),
            name: "Ollama Local".into(),
            kind: ProviderKind::Ollama,
            api_key: "ollama".into(),
            base_url: "http://localhost:11434/v1".into(),
            model_name: "llama3".into(),
        },
    ]
}

pub enum Provider {
    Gemini(GeminiClient),
    OpenAiCompatible(OpenAiClient),
}

impl Provider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, GenerationError> {
        match config.kind {
            ProviderKind::Google => Ok(Provider::Gemini(GeminiClient::from_config(config)?)),
            ProviderKind::OpenAi | ProviderKind::Ollama => {
                Ok(Provider::OpenAiCompatible(OpenAiClient::from_config(config)))
            }
        }
    }
}

#[async_trait]
impl ContentProvider for Provider {
    async fn generate(&self, prompt: &str, count: usize) -> Result<Vec<String>, GenerationError> {
        match self {
            Provider::Gemini(client) => client.generate(prompt, count).await,
            Provider::OpenAiCompatible(client) => client.generate(prompt, count).await,
        }
    }
}

pub struct ProviderSettings {
    store: Box<dyn KeyValueStore>,
    configs: Vec<ProviderConfig>,
    active_id: String,
}

impl ProviderSettings {
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let configs = match read_configs(store.as_ref()) {
            Ok(Some(configs)) if !configs.is_empty() => configs,
            Ok(_) => default_configs(),
            Err(err) => {
                warn!("discarding unreadable provider configs: {err}");
                default_configs()
            }
        };
        let active_id = match store.get(ACTIVE_PROVIDER_KEY) {
            Ok(Some(id)) if !id.trim().is_empty() => id.trim().to_string(),
            Ok(_) => configs[0].id.clone(),
            Err(err) => {
                warn!("could not read active provider: {err}");
                configs[0].id.clone()
            }
        };
        ProviderSettings {
            store,
            configs,
            active_id,
        }
    }

    pub fn configs(&self) -> &[ProviderConfig] {
        &self.configs
    }

    pub fn active(&self) -> &ProviderConfig {
        self.configs
            .iter()
            .find(|c| c.id == self.active_id)
            .unwrap_or(&self.configs[0])
    }

    pub fn config(&self, id: &str) -> Option<&ProviderConfig> {
        self.configs.iter().find(|c| c.id == id)
    }

    pub fn select(&mut self, id: &str) -> Result<bool, StorageError> {
        if self.config(id).is_none() {
            return Ok(false);
        }
        self.active_id = id.to_string();
        self.store.set(ACTIVE_PROVIDER_KEY, id)?;
        Ok(true)
    }

    // Replaces the config with the same id, or appends a new one.
    pub fn upsert(&mut self, config: ProviderConfig) -> Result<(), StorageError> {
        match self.configs.iter_mut().find(|c| c.id == config.id) {
            Some(existing) => *existing = config,
            None => self.configs.push(config),
        }
        self.save()
    }

    // The last remaining config cannot be removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, StorageError> {
        if self.configs.len() <= 1 || self.config(id).is_none() {
            return Ok(false);
        }
        self.configs.retain(|c| c.id != id);
        self.save()?;
        if self.active_id == id {
            let fallback = self.configs[0].id.clone();
            info!(removed = id, active = %fallback, "active provider removed");
            self.store.set(ACTIVE_PROVIDER_KEY, &fallback)?;
            self.active_id = fallback;
        }
        Ok(true)
    }

    pub fn save(&mut self) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&self.configs)?;
        self.store.set(PROVIDER_CONFIGS_KEY, &raw)
    }
}

fn read_configs(store: &dyn KeyValueStore) -> Result<Option<Vec<ProviderConfig>>, StorageError> {
    match store.get(PROVIDER_CONFIGS_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_when_nothing_is_stored() {
        let settings = ProviderSettings::load(Box::new(MemoryStore::new()));
        assert_eq!(settings.configs().len(), 3);
        assert_eq!(settings.active().id, "default-gemini");
    }

    #[test]
    fn unknown_active_id_falls_back_to_first() {
        let mut store = MemoryStore::new();
        store.set(ACTIVE_PROVIDER_KEY, "removed-provider").unwrap();
        let settings = ProviderSettings::load(Box::new(store));
        assert_eq!(settings.active().id, "default-gemini");
    }

    #[test]
    fn selection_is_persisted() {
        let shared = MemoryStore::new();
        let mut settings = ProviderSettings::load(Box::new(shared.clone()));
        assert!(settings.select("local-ollama").unwrap());
        assert!(!settings.select("nope").unwrap());
        assert_eq!(settings.active().kind, ProviderKind::Ollama);

        let reloaded = ProviderSettings::load(Box::new(shared));
        assert_eq!(reloaded.active().id, "local-ollama");
    }

    #[test]
    fn stored_configs_use_camel_case_layout() {
        let mut store = MemoryStore::new();
        store
            .set(
                PROVIDER_CONFIGS_KEY,
                r#"[{"id":"mine","name":"Mine","provider":"openai","apiKey":"k","baseUrl":"http://x","modelName":"m"}]"#,
            )
            .unwrap();
        let settings = ProviderSettings::load(Box::new(store));
        let active = settings.active();
        assert_eq!(active.id, "mine");
        assert_eq!(active.kind, ProviderKind::OpenAi);
        assert_eq!(active.model_name, "m");
    }

    #[test]
    fn gemini_without_key_is_a_configuration_error() {
        let mut config = default_configs().remove(0);
        config.api_key.clear();
        match gemini::resolve_api_key(&config, |_| None) {
            Err(GenerationError::MissingConfiguration { provider }) => {
                assert_eq!(provider, "Default (Gemini)")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn edited_and_added_configs_survive_reload() {
        let shared = MemoryStore::new();
        let mut settings = ProviderSettings::load(Box::new(shared.clone()));
        let mut deepseek = settings.config("deepseek-example").unwrap().clone();
        deepseek.api_key = "sk-real".into();
        settings.upsert(deepseek).unwrap();
        let mut added = ProviderConfig::blank("1700000000000");
        added.name = "Proxy".into();
        settings.upsert(added).unwrap();

        let raw = shared.get(PROVIDER_CONFIGS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"apiKey\":\"sk-real\""));

        let reloaded = ProviderSettings::load(Box::new(shared));
        assert_eq!(reloaded.configs().len(), 4);
        assert_eq!(reloaded.config("deepseek-example").unwrap().api_key, "sk-real");
        let proxy = reloaded.config("1700000000000").unwrap();
        assert_eq!((proxy.name.as_str(), proxy.kind), ("Proxy", ProviderKind::OpenAi));
    }

    #[test]
    fn removing_the_active_config_falls_back_to_the_first() {
        let shared = MemoryStore::new();
        let mut settings = ProviderSettings::load(Box::new(shared.clone()));
        settings.select("local-ollama").unwrap();
        assert!(settings.remove("local-ollama").unwrap());
        assert!(!settings.remove("local-ollama").unwrap());
        assert_eq!(settings.active().id, "default-gemini");

        let reloaded = ProviderSettings::load(Box::new(shared));
        assert_eq!(reloaded.configs().len(), 2);
        assert_eq!(reloaded.active().id, "default-gemini");
        assert_eq!(
            reloaded.store.get(ACTIVE_PROVIDER_KEY).unwrap().as_deref(),
            Some("default-gemini")
        );
    }

    #[test]
    fn last_config_is_never_removed() {
        let mut settings = ProviderSettings::load(Box::new(MemoryStore::new()));
        assert!(settings.remove("deepseek-example").unwrap());
        assert!(settings.remove("default-gemini").unwrap());
        assert!(!settings.remove("local-ollama").unwrap());
        assert_eq!(settings.active().id, "local-ollama");
    }

    #[test]
    fn kind_codes() {
        assert_eq!(ProviderKind::from_code(" OpenAI "), Some(ProviderKind::OpenAi));
        assert_eq!(ProviderKind::from_code("gemini"), Some(ProviderKind::Google));
        assert_eq!(ProviderKind::from_code("claude"), None);
        assert_eq!(ProviderKind::Ollama.code(), "ollama");
    }
}
