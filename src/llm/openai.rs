use super::{CompletionBackend, LlmError, Message};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL_NAME: &str = "gpt-3.5-turbo";
// generation of a whole document can be slow
const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// OpenAI-compatible endpoint settings, read from the unprefixed `OPENAI_*` variables
#[derive(Deserialize, Clone, PartialEq, Default)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub openai_api_key: String,
    #[serde(default)]
    pub openai_api_base: Option<String>,
    #[serde(default)]
    pub openai_model_name: Option<String>,
    #[serde(default)]
    pub openai_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("openai_api_key", &"<redacted>")
            .field("openai_api_base", &self.openai_api_base)
            .field("openai_model_name", &self.openai_model_name)
            .field("openai_timeout_secs", &self.openai_timeout_secs)
            .finish()
    }
}

impl OpenAiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(envy::from_env::<OpenAiConfig>()?)
    }

    pub fn api_base(&self) -> &str {
        // an empty OPENAI_API_BASE means "not set"
        self.openai_api_base
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_API_BASE)
    }

    pub fn model_name(&self) -> &str {
        self.openai_model_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_MODEL_NAME)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.openai_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }
}

pub struct OpenAiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        if config.openai_api_key.is_empty() {
            return Err(LlmError::NotConfigured("OPENAI_API_KEY is not set".to_string()));
        }
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            model: config.model_name().to_string(),
            base_url: config.api_base().trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete_json(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": messages,
            "response_format": { "type": "json_object" },
        });

        debug!("OpenAI request to {} (model {})", url, self.model);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Unauthorized {
                status: status.as_u16(),
                body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let resp: CompletionResponse = response.json().await?;
        debug!("model response with {} choices", resp.choices.len());
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("missing choices[0].message.content".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(key: &str) -> OpenAiConfig {
        OpenAiConfig {
            openai_api_key: key.to_string(),
            openai_api_base: None,
            openai_model_name: None,
            openai_timeout_secs: None,
        }
    }

    #[test]
    fn test_config_defaults() {
        let conf = config("sk-test");
        assert_eq!(conf.api_base(), "https://api.openai.com/v1");
        assert_eq!(conf.model_name(), "gpt-3.5-turbo");
        assert_eq!(conf.timeout(), Duration::from_secs(180));

        let conf = OpenAiConfig {
            openai_api_base: Some(String::new()),
            openai_model_name: Some("gpt-4o-mini".to_string()),
            ..config("sk-test")
        };
        assert_eq!(conf.api_base(), "https://api.openai.com/v1");
        assert_eq!(conf.model_name(), "gpt-4o-mini");
    }

    #[test]
    fn test_client_requires_api_key() {
        assert!(matches!(
            OpenAiClient::new(&config("")),
            Err(LlmError::NotConfigured(_))
        ));

        let conf = OpenAiConfig {
            openai_api_base: Some("http://localhost:8000/v1/".to_string()),
            ..config("sk-test")
        };
        let client = OpenAiClient::new(&conf).unwrap();
        assert_eq!(client.base_url, "http://localhost:8000/v1");
        assert_eq!(client.model(), "gpt-3.5-turbo");
    }

    #[test]
    fn test_message_serialization() {
        let value = serde_json::to_value(Message::system("split")).unwrap();
        assert_eq!(value, json!({"role": "system", "content": "split"}));
    }
}
