//! OpenAI-compatible chat-completions backend
//!
//! Works against any endpoint that speaks the `/v1/chat/completions` protocol
//! (OpenAI itself, proxies, and gateway services with compatible APIs).

use async_trait::async_trait;
use pagesmith_config::{LlmConfig, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::LlmError;
use crate::http_client::HttpClient;
use crate::types::{LlmBackend, LlmInvocation, LlmResult, Message};

const PROVIDER: &str = "openai";

/// HTTP request parameters
#[derive(Debug, Clone)]
pub(crate) struct HttpParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// OpenAI-compatible backend
#[derive(Clone)]
pub(crate) struct OpenAiBackend {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Secret,
    default_model: String,
    default_params: HttpParams,
}

impl OpenAiBackend {
    /// Create a new backend
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(
        api_key: Secret,
        base_url: String,
        default_model: String,
        default_params: HttpParams,
    ) -> Result<Self, LlmError> {
        let client = HttpClient::new()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key,
            default_model,
            default_params,
        })
    }

    /// Create a backend from the resolved `[llm]` configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key is empty or the HTTP
    /// client cannot be constructed
    pub fn new_from_config(config: &LlmConfig, api_key: &Secret) -> Result<Self, LlmError> {
        if api_key.expose().trim().is_empty() {
            return Err(LlmError::Misconfiguration(
                "Generation API key is empty".to_string(),
            ));
        }

        Self::new(
            api_key.clone(),
            config.base_url.clone(),
            config.model.clone(),
            HttpParams {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        )
    }

    /// Resolve the model for this invocation
    fn resolve_model(&self, inv: &LlmInvocation) -> String {
        if inv.model.is_empty() {
            self.default_model.clone()
        } else {
            inv.model.clone()
        }
    }

    /// Build the request body for an invocation
    fn build_request(&self, inv: &LlmInvocation) -> ChatRequest {
        ChatRequest {
            model: self.resolve_model(inv),
            messages: Self::convert_messages(&inv.messages),
            max_tokens: self.default_params.max_tokens,
            temperature: self.default_params.temperature,
            stream: false,
            response_format: inv.json_output.then(|| ResponseFormat {
                kind: "json_object".to_string(),
            }),
        }
    }

    /// Convert messages to wire format
    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage> {
        messages
            .iter()
            .map(|msg| ChatMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
            })
            .collect()
    }

    /// Extract the assistant text from a decoded response body
    fn extract_result(body: ChatResponse, model: String) -> Result<LlmResult, LlmError> {
        let choice = body.choices.into_iter().next().ok_or_else(|| {
            LlmError::Transport("Generation response missing choices[0]".to_string())
        })?;

        let content = choice.message.content.ok_or_else(|| {
            LlmError::Transport("Generation response missing content in choices[0]".to_string())
        })?;

        let mut result = LlmResult::new(content, PROVIDER, body.model.unwrap_or(model));
        if let Some(usage) = body.usage {
            result = result.with_tokens(usage.prompt_tokens, usage.completion_tokens);
        }
        Ok(result)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let request_body = self.build_request(&inv);
        let model = request_body.model.clone();

        debug!(
            provider = PROVIDER,
            unit_of_work = %inv.unit_of_work,
            model = %model,
            json_output = inv.json_output,
            timeout_secs = inv.timeout.as_secs(),
            "Invoking generation backend"
        );

        let request = self
            .client
            .post(&self.base_url)
            .bearer_auth(self.api_key.expose())
            .json(&request_body);

        let response = self.client.execute(request, inv.timeout, PROVIDER).await?;

        let response_body: ChatResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse generation response: {}", e))
        })?;

        let result = Self::extract_result(response_body, model)?;

        debug!(
            provider = PROVIDER,
            tokens_input = ?result.tokens_input,
            tokens_output = ?result.tokens_output,
            response_chars = result.raw_response.len(),
            "Generation invocation completed"
        );

        Ok(result)
    }

    fn provider(&self) -> &str {
        PROVIDER
    }
}

/// Message format for requests
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

/// Chat-completions request body
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

/// Message format for responses
#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Chat-completions response body
#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChatResponseMessage,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}
