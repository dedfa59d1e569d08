use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::ExtractError;
use crate::prompt::ExtractionRequest;

/// The text-generation service that performs the actual extraction.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ExtractError>;
}

fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn map_send_error(e: reqwest::Error, timeout_secs: u64) -> ExtractError {
    if e.is_timeout() {
        ExtractError::Timeout(timeout_secs)
    } else {
        e.into()
    }
}

#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, timeout_secs: u64) -> Self {
        Self {
            base_url,
            model,
            timeout_secs,
            client: http_client(timeout_secs),
        }
    }

    pub fn default() -> Self {
        Self::new(
            "http://localhost:11434".to_string(),
            "llama3".to_string(),
            60,
        )
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ExtractError> {
        let url = format!("{}/api/generate", self.base_url);

        let body = OllamaRequest {
            model: self.model.clone(),
            prompt: request.prompt.clone(),
            stream: false,
            options: OllamaOptions { temperature: 0.1 },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        Ok(ollama_response.response)
    }
}

/// Azure OpenAI chat-completions deployment.
#[derive(Clone)]
pub struct AzureOpenAiClient {
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    temperature: f32,
    timeout_secs: u64,
    client: reqwest::Client,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl AzureOpenAiClient {
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: api_version.into(),
            api_key: api_key.into(),
            temperature: 0.1,
            timeout_secs,
            client: http_client(timeout_secs),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[async_trait]
impl TextGenerator for AzureOpenAiClient {
    async fn generate(&self, request: &ExtractionRequest) -> Result<String, ExtractError> {
        let body = ChatRequest {
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| map_send_error(e, self.timeout_secs))?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ExtractError::Decode("response has no choices".to_string()))
    }
}
