//! Mistral chat-completions client
//!
//! Speaks the OpenAI-compatible `/chat/completions` protocol, so any service
//! exposing that endpoint can stand in through `base_url`.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::config::{GeneratorConfig, SamplingParams};
use super::{ChatMessage, Generator};

/// Blocking client for a hosted chat model
pub struct MistralGenerator {
    client: Client,
    endpoint: String,
    model: String,
}

impl MistralGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .context("missing API key for the generator")?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("invalid generator API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .context("failed to build generator HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model_id,
        })
    }
}

impl Generator for MistralGenerator {
    fn generate(&self, messages: &[ChatMessage], params: &SamplingParams) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: params.temperature,
            max_tokens: params.max_new_tokens,
            messages,
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .context("failed to call chat completions")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("chat completions returned {}: {}", status, text);
        }

        let parsed: ChatResponse = resp.json().context("failed to parse chat response")?;
        first_answer(parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn first_answer(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .context("chat response contained no choices")
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
