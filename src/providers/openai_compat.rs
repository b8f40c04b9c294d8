//! Chat completions over the OpenAI wire format
//!
//! Anything speaking `POST {base}/chat/completions` works: OpenAI itself, or a
//! local server via `OPENAI_BASE_URL`. The relay wants exactly one reply, so
//! requests are non-streaming and only the first choice is read.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::conversation::Message;

use super::{CompletionProvider, CompletionSettings, ProviderError};

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// `{ "error": { "message": ... } }` as returned on failures
#[derive(Debug, Deserialize)]
struct UpstreamFailure {
    error: UpstreamFailureDetail,
}

#[derive(Debug, Deserialize)]
struct UpstreamFailureDetail {
    message: String,
}

#[derive(Debug, Clone)]
pub struct OpenAICompatConfig {
    /// e.g. `https://api.openai.com/v1`, without a trailing slash
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl OpenAICompatConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            api_key: config.credential().map(str::to_string),
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct OpenAICompatProvider {
    config: OpenAICompatConfig,
    client: Client,
}

impl OpenAICompatProvider {
    pub fn new(config: OpenAICompatConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompatProvider {
    async fn complete(
        &self,
        messages: &[Message],
        settings: &CompletionSettings,
    ) -> Result<Option<String>, ProviderError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ProviderError::NotConfigured(
                "no API key for the completion provider".into(),
            ));
        };

        let request = CompletionRequest {
            model: &settings.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<UpstreamFailure>(&body)
                .map(|f| f.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let completion: CompletionResponse = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse response: {}", e))
        })?;

        Ok(first_reply(completion))
    }
}

fn first_reply(completion: CompletionResponse) -> Option<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
}
