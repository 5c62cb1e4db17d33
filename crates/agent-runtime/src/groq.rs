//! Groq LLM Provider
//!
//! Implementation of `LlmProvider` for Groq's OpenAI-compatible
//! chat-completions API. The API key is supplied by the caller, so one
//! provider is built per request through [`GroqFactory`]. Every provider a
//! factory hands out shares the factory's connection pool.

use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, GenerationOptions, LlmProvider, ProviderFactory},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Groq provider configuration
#[derive(Clone, Debug)]
pub struct GroqConfig {
    /// API base URL (OpenAI-compatible)
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".into(),
            timeout_secs: 120,
        }
    }
}

/// Groq chat provider bound to one API key
pub struct GroqProvider {
    client: reqwest::Client,
    config: GroqConfig,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqProvider {
    /// Create a provider for `api_key` on an existing client.
    ///
    /// A blank key is rejected up front as an authentication failure.
    pub fn new(
        client: reqwest::Client,
        config: GroqConfig,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AgentError::Auth("Groq API key is required".into()));
        }

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    /// Convert agent messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: match m.role {
                    Role::System => "system",
                    Role::Human => "user",
                    Role::Assistant => "assistant",
                },
                content: &m.content,
            })
            .collect()
    }

    fn convert_completion(response: ChatResponse, model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("response contained no choices".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: response.model.unwrap_or_else(|| model.to_string()),
        })
    }

    fn status_error(status: StatusCode, body: &str) -> AgentError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(body.to_string()),
            StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(body.to_string()),
            s if s.is_server_error() => AgentError::ProviderUnavailable(format!("{s}: {body}")),
            s => AgentError::Provider(format!("{s}: {body}")),
        }
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    fn name(&self) -> &str {
        "Groq"
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &options.model,
            messages: Self::convert_messages(messages),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, &body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Provider(format!("invalid response body: {e}")))?;

        tracing::debug!(model = %options.model, "Groq completion received");
        Self::convert_completion(body, &options.model)
    }
}

/// Builds a [`GroqProvider`] per caller-supplied key.
///
/// The HTTP client is built once here and cloned into each provider.
#[derive(Clone, Debug)]
pub struct GroqFactory {
    client: reqwest::Client,
    config: GroqConfig,
}

impl GroqFactory {
    pub fn new(config: GroqConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &GroqConfig {
        &self.config
    }
}

impl ProviderFactory for GroqFactory {
    fn create(&self, api_key: &str) -> Result<Arc<dyn LlmProvider>> {
        let provider = GroqProvider::new(self.client.clone(), self.config.clone(), api_key)?;
        Ok(Arc::new(provider))
    }
}
