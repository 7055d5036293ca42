use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::parse::{extract_tokens, take_unique};
use super::{ContentProvider, GenerationError, ProviderConfig, ProviderKind};

const OPENAI_BASE: &str = "https://api.openai.com/v1";
const OLLAMA_BASE: &str = "http://localhost:11434/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const PLACEHOLDER_KEY: &str = "sk-placeholder";

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

pub fn endpoint_for(config: &ProviderConfig) -> String {
    let base = match config.base_url.trim() {
        "" if config.kind == ProviderKind::Ollama => OLLAMA_BASE,
        "" => OPENAI_BASE,
        base => base,
    };
    format!("{}/chat/completions", base.trim_end_matches('/'))
}

fn system_prompt(prompt: &str, count: usize) -> String {
    format!(
        "Generate a list of exactly {count} unique, distinct emojis related to the theme: \"{prompt}\". \
         If the theme is abstract, use metaphoric emojis. \
         Ensure strictly no duplicates. Return ONLY JSON. \
         Return format: {{ \"emojis\": [\"😀\", ...] }}"
    )
}

impl OpenAiClient {
    pub fn from_config(config: &ProviderConfig) -> Self {
        let api_key = match config.api_key.trim() {
            "" => PLACEHOLDER_KEY.to_string(),
            key => key.to_string(),
        };
        let model = match config.model_name.trim() {
            "" => DEFAULT_MODEL.to_string(),
            model => model.to_string(),
        };
        OpenAiClient {
            http: reqwest::Client::new(),
            endpoint: endpoint_for(config),
            api_key,
            model,
        }
    }

    fn request_body(&self, prompt: &str, count: usize) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt(prompt, count) },
                { "role": "user", "content": format!("Theme: {prompt}") },
            ],
            "temperature": 0.7,
            "response_format": { "type": "json_object" },
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

fn first_content(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()?
        .message?
        .content
        .filter(|c| !c.trim().is_empty())
}

#[async_trait]
impl ContentProvider for OpenAiClient {
    async fn generate(&self, prompt: &str, count: usize) -> Result<Vec<String>, GenerationError> {
        debug!(endpoint = %self.endpoint, model = %self.model, count, "requesting theme");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, count))
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

        let parsed: ChatResponse = response.json().await?;
        let content = first_content(parsed).ok_or(GenerationError::EmptyResponse)?;
        take_unique(extract_tokens(&content)?, count)
    }
}
