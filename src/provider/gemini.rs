use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::parse::{extract_tokens, take_unique};
use super::{ContentProvider, GenerationError, ProviderConfig};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

pub fn resolve_api_key(
    config: &ProviderConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, GenerationError> {
    if !config.api_key.trim().is_empty() {
        return Ok(config.api_key.trim().to_string());
    }
    KEY_ENV_VARS
        .iter()
        .find_map(|name| env(name).filter(|v| !v.trim().is_empty()))
        .ok_or_else(|| GenerationError::MissingConfiguration {
            provider: config.name.clone(),
        })
}

impl GeminiClient {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, GenerationError> {
        let api_key = resolve_api_key(config, |name| std::env::var(name).ok())?;
        let model = if config.model_name.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            config.model_name.trim().to_string()
        };
        let base_url = if config.base_url.trim().is_empty() {
            API_BASE.to_string()
        } else {
            config.base_url.trim().trim_end_matches('/').to_string()
        };
        Ok(GeminiClient {
            http: reqwest::Client::new(),
            api_key,
            model,
            base_url,
        })
    }

    fn request_body(prompt: &str, count: usize) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [{ "text": format!("Generate {count} unique emojis for theme: {prompt}") }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "OBJECT",
                    "properties": {
                        "emojis": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" },
                            "description": format!("An array of exactly {count} emojis."),
                        }
                    },
                    "required": ["emojis"],
                }
            }
        })
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

fn response_text(response: GenerateResponse) -> Option<String> {
    let text: String = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl ContentProvider for GeminiClient {
    async fn generate(&self, prompt: &str, count: usize) -> Result<Vec<String>, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(model = %self.model, count, "requesting theme from Gemini");
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt, count))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        let text = response_text(parsed).ok_or(GenerationError::EmptyResponse)?;
        take_unique(extract_tokens(&text)?, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;

    fn config(key: &str) -> ProviderConfig {
        ProviderConfig {
            id: "g".into(),
            name: "Gemini".into(),
            kind: ProviderKind::Google,
            api_key: key.into(),
            base_url: String::new(),
            model_name: String::new(),
        }
    }

    #[test]
    fn key_comes_from_config_then_env() {
        assert_eq!(resolve_api_key(&config(" abc "), |_| None).unwrap(), "abc");
        let from_env = resolve_api_key(&config(""), |name| {
            (name == "API_KEY").then(|| "env-key".to_string())
        });
        assert_eq!(from_env.unwrap(), "env-key");
    }

    #[test]
    fn request_asks_for_an_emoji_schema() {
        let body = GeminiClient::request_body("ocean", 18);
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["required"][0], "emojis");
        let text = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(text.contains("18") && text.contains("ocean"));
    }

    #[test]
    fn response_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"emojis\":"},{"text":"[\"a\"]}"}]}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response_text(parsed).unwrap(), r#"{"emojis":["a"]}"#);

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(response_text(empty).is_none());
    }
}
