//! Image Generation Collaborator
//!
//! Cover images are best-effort: the pipeline treats any failure here as
//! "no cover image" and completes anyway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::provider::resolve_api_key;
use crate::config::ImageConfig;
use crate::constants::network;
use crate::types::{DraftError, ErrorClassifier, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Outcome of one image request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageResult {
    pub success: bool,
    /// PNG bytes, base64 encoded
    pub image_base64: Option<String>,
}

impl ImageResult {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn from_base64(data: String) -> Self {
        Self {
            success: true,
            image_base64: Some(data),
        }
    }

    /// Decode the image payload, if any
    pub fn decode(&self) -> Result<Option<Vec<u8>>> {
        self.image_base64
            .as_deref()
            .map(|data| {
                base64::engine::general_purpose::STANDARD
                    .decode(data)
                    .map_err(|e| DraftError::parse("image", format!("invalid base64: {}", e)))
            })
            .transpose()
    }
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, prompt: &str) -> Result<ImageResult>;

    fn name(&self) -> &str;
}

pub type SharedImageGenerator = Arc<dyn ImageGenerator>;

/// Generator used when cover images are turned off
#[derive(Debug, Default)]
pub struct DisabledImageGenerator;

#[async_trait]
impl ImageGenerator for DisabledImageGenerator {
    async fn generate_image(&self, _prompt: &str) -> Result<ImageResult> {
        Ok(ImageResult::failed())
    }

    fn name(&self) -> &str {
        "disabled"
    }
}

/// OpenAI Images API (`/images/generations`, base64 response)
pub struct OpenAiImageGenerator {
    api_key: SecretString,
    api_base: String,
    model: String,
    size: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiImageGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiImageGenerator")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("size", &self.size)
            .finish()
    }
}

impl OpenAiImageGenerator {
    pub fn new(config: &ImageConfig, api_base: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(network::IMAGE_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(network::CONNECTION_TIMEOUT_SECS))
            .build()
            .map_err(|e| DraftError::LlmApi(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: resolve_api_key(None)?,
            api_base: api_base
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: config.model.clone(),
            size: config.size.clone(),
            client,
        })
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate_image(&self, prompt: &str) -> Result<ImageResult> {
        let url = format!("{}/images/generations", self.api_base);
        let body = ImageRequest {
            model: &self.model,
            prompt,
            n: 1,
            size: &self.size,
            response_format: "b64_json",
        };

        debug!(prompt_chars = prompt.len(), "Requesting cover image");

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| DraftError::LlmApi(format!("Image request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DraftError::Llm(ErrorClassifier::classify_http_status(
                status.as_u16(),
                &format!("Image API error ({}): {}", status, text),
                "openai-images",
            )));
        }

        let parsed: ImageResponse = response
            .json()
            .await
            .map_err(|e| DraftError::LlmApi(format!("Failed to parse image response: {}", e)))?;

        match parsed.data.into_iter().find_map(|d| d.b64_json) {
            Some(data) => {
                info!("Cover image generated");
                Ok(ImageResult::from_base64(data))
            }
            None => Ok(ImageResult::failed()),
        }
    }

    fn name(&self) -> &str {
        "openai-images"
    }
}

/// Build the generator named in config
pub fn create_image_generator(
    config: &ImageConfig,
    api_base: Option<String>,
) -> Result<SharedImageGenerator> {
    if !config.enabled {
        return Ok(Arc::new(DisabledImageGenerator));
    }
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiImageGenerator::new(config, api_base)?)),
        "none" => Ok(Arc::new(DisabledImageGenerator)),
        other => Err(DraftError::Config(format!(
            "Unknown image provider: {}. Supported: openai, none",
            other
        ))),
    }
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
}
