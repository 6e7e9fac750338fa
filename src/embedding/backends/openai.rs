//! Hosted embeddings over an OpenAI-compatible `/embeddings` endpoint

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::embedding::{normalize_embedding, Embedder, Embedding, EmbeddingConfig};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: usize = 4;

/// Blocking embeddings client
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    request_dimensions: Option<usize>,
    max_retries: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Build a client from the embedding configuration; a key is required
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .context("missing API key for the openai embedding backend (set OPENAI_API_KEY)")?;
        anyhow::ensure!(!config.model_name.trim().is_empty(), "missing embedding model name");

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("invalid embeddings API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .default_headers(headers)
            .build()
            .context("failed to build embeddings HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model_name.clone(),
            dimension: config.request_dimensions.unwrap_or(config.dimension),
            request_dimensions: config.request_dimensions,
            max_retries: DEFAULT_MAX_RETRIES,
            batch_size: config.batch_size.max(1),
        })
    }

    fn request_body<'a>(&'a self, inputs: &'a [&'a str]) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            model: &self.model,
            input: inputs,
            dimensions: self.request_dimensions,
        }
    }

    /// Send one request worth of inputs, retrying on rate limits and server errors
    fn request(&self, inputs: &[&str]) -> Result<Vec<Embedding>> {
        let mut attempt = 0usize;
        loop {
            let body = self.request_body(inputs);

            match self.client.post(&self.endpoint).json(&body).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp
                            .json()
                            .context("failed to parse embeddings response")?;
                        return into_embeddings(parsed, inputs.len(), self.dimension);
                    }

                    let text = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!("Embeddings request returned {}, retrying", status);
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    anyhow::bail!("embeddings request failed ({}): {}", status, text);
                }
                Err(err) => {
                    if (err.is_timeout() || err.is_connect()) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!("Embeddings request error ({}), retrying", err);
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(err).context("embeddings request could not be sent");
                }
            }
        }
    }
}

impl Embedder for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        self.request(&[text])?
            .pop()
            .context("embeddings response was empty")
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>> {
        let mut all = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            all.extend(self.request(batch)?);
        }
        Ok(all)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

/// Order vectors by their `index`, check their shape and normalize them
fn into_embeddings(
    mut response: EmbeddingResponse,
    expected: usize,
    dimension: usize,
) -> Result<Vec<Embedding>> {
    response.data.sort_by_key(|entry| entry.index);
    anyhow::ensure!(
        response.data.len() == expected,
        "received {} embeddings for {} inputs",
        response.data.len(),
        expected
    );

    response
        .data
        .into_iter()
        .map(|entry| {
            anyhow::ensure!(
                entry.embedding.len() == dimension,
                "embedding has dimension {}, expected {}",
                entry.embedding.len(),
                dimension
            );
            let mut embedding = entry.embedding;
            normalize_embedding(&mut embedding);
            Ok(embedding)
        })
        .collect()
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
