//! Async HTTP client for the decision service
//!
//! A model-agnostic client for LLM APIs, supporting both Anthropic and
//! OpenAI-compatible endpoints. Transport and API errors surface as
//! [`DecisionError::Unavailable`]; the scheduler's fallback handles them.

use crate::decision::context::{self, DeliberationContext};
use crate::decision::parser;
use crate::decision::source::{
    DecisionError, DecisionSource, Deliberation, TurnDecision, TurnRequest,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// API format type
#[derive(Debug, Clone, PartialEq)]
pub enum ApiFormat {
    Anthropic,
    OpenAI,
}

/// Async LLM client for making API calls
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    model: String,
    api_format: ApiFormat,
}

impl LlmClient {
    /// Create a new client with explicit configuration
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        let api_format = Self::detect_api_format(&api_url);
        Self {
            client: Client::new(),
            api_key,
            api_url,
            model,
            api_format,
        }
    }

    fn detect_api_format(url: &str) -> ApiFormat {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            // OpenAI, DeepSeek, and other compatible APIs use OpenAI format
            ApiFormat::OpenAI
        }
    }

    /// Create a client from environment variables
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to Anthropic API)
    /// Optional: LLM_MODEL (defaults to claude-3-haiku-20240307)
    pub fn from_env() -> Result<Self, DecisionError> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| DecisionError::Unavailable("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-3-haiku-20240307".into());

        Ok(Self::new(api_key, api_url, model))
    }

    /// Send a completion request, returning the raw text response
    pub async fn complete(&self, system: &str, user: &str) -> Result<String, DecisionError> {
        match self.api_format {
            ApiFormat::Anthropic => self.complete_anthropic(system, user).await,
            ApiFormat::OpenAI => self.complete_openai(system, user).await,
        }
    }

    async fn complete_anthropic(&self, system: &str, user: &str) -> Result<String, DecisionError> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            system: system.into(),
            messages: vec![Message {
                role: "user".into(),
                content: user.into(),
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DecisionError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DecisionError::Unavailable(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| DecisionError::Unavailable(e.to_string()))?;

        completion
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| DecisionError::Unavailable("empty response".into()))
    }

    async fn complete_openai(&self, system: &str, user: &str) -> Result<String, DecisionError> {
        let request = OpenAIRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            messages: vec![
                Message {
                    role: "system".into(),
                    content: system.into(),
                },
                Message {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DecisionError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DecisionError::Unavailable(format!(
                "API error: {}",
                error_text
            )));
        }

        let completion: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| DecisionError::Unavailable(e.to_string()))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| DecisionError::Unavailable("empty response".into()))
    }
}

// Anthropic API format
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    text: String,
}

// OpenAI-compatible API format
#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

// Shared
#[derive(Serialize)]
struct Message {
    role: String,
    content: String,
}

/// A [`DecisionSource`] backed by the LLM client
pub struct LlmDecisionSource {
    client: LlmClient,
}

impl LlmDecisionSource {
    pub fn new(client: LlmClient) -> Self {
        Self { client }
    }

    pub fn from_env() -> Result<Self, DecisionError> {
        Ok(Self::new(LlmClient::from_env()?))
    }
}

impl DecisionSource for LlmDecisionSource {
    fn request_turn(
        &self,
        request: TurnRequest,
    ) -> impl Future<Output = Result<TurnDecision, DecisionError>> + Send {
        async move {
            let user = context::turn_prompt(&request);
            let response = self
                .client
                .complete(parser::TURN_SYSTEM_PROMPT, &user)
                .await?;
            parser::parse_turn(&response)
        }
    }

    fn request_deliberation(
        &self,
        summary: DeliberationContext,
    ) -> impl Future<Output = Result<Deliberation, DecisionError>> + Send {
        async move {
            let user = context::deliberation_prompt(&summary);
            let response = self
                .client
                .complete(parser::DELIBERATION_SYSTEM_PROMPT, &user)
                .await?;
            parser::parse_deliberation(&response)
        }
    }
}
