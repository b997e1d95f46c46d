//! Cover image generation
//!
//! A completion call turns title and summary into an image prompt, then the
//! image collaborator renders it. Every failure here is non-fatal.

use std::time::Duration;

use tracing::{debug, warn};

use crate::ai::image::SharedImageGenerator;
use crate::ai::metrics::SharedMetrics;
use crate::ai::provider::{CompletionRequest, SharedProvider};
use crate::ai::timeout::with_timeout;
use crate::types::{DraftError, Result};

use super::prompts::CoverPromptParams;

pub const STAGE: &str = "generate_assets";

/// Generated cover image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    /// Prompt the image was rendered from
    pub prompt: String,
    pub image_base64: String,
}

pub struct AssetGenerator {
    provider: SharedProvider,
    images: SharedImageGenerator,
    metrics: SharedMetrics,
    completion_timeout: Duration,
    image_timeout: Duration,
}

impl AssetGenerator {
    pub fn new(
        provider: SharedProvider,
        images: SharedImageGenerator,
        metrics: SharedMetrics,
        completion_timeout: Duration,
        image_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            images,
            metrics,
            completion_timeout,
            image_timeout,
        }
    }

    /// Prompt the completion client for an image description
    pub async fn cover_prompt(&self, title: &str, summary: &str) -> Result<String> {
        let prompt = CoverPromptParams { title, summary }.build()?;
        let response = with_timeout(
            self.completion_timeout,
            self.provider.complete(&CompletionRequest::new(prompt)),
            "cover prompt completion",
        )
        .await?;
        self.metrics.record(STAGE, &response);

        let prompt = response.content.trim().trim_matches('"').trim().to_string();
        if prompt.is_empty() {
            return Err(DraftError::pipeline(STAGE, "empty cover prompt"));
        }
        Ok(prompt)
    }

    /// Render an image for `prompt`; `None` when the collaborator declined
    pub async fn render(&self, prompt: &str) -> Result<Option<String>> {
        let result = with_timeout(
            self.image_timeout,
            self.images.generate_image(prompt),
            "cover image generation",
        )
        .await?;

        Ok(result
            .image_base64
            .filter(|data| result.success && !data.is_empty()))
    }

    /// Best-effort cover image: errors are logged and yield `None`
    pub async fn generate(&self, title: &str, summary: &str) -> Option<CoverImage> {
        let prompt = match self.cover_prompt(title, summary).await {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Cover prompt failed; continuing without cover image");
                return None;
            }
        };

        match self.render(&prompt).await {
            Ok(Some(image_base64)) => {
                debug!(generator = self.images.name(), "Cover image generated");
                Some(CoverImage {
                    prompt,
                    image_base64,
                })
            }
            Ok(None) => {
                warn!(
                    generator = self.images.name(),
                    "Image generator returned no image"
                );
                None
            }
            Err(e) => {
                warn!(error = %e, "Cover image failed; continuing without cover image");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::image::{DisabledImageGenerator, ImageGenerator, ImageResult};
    use crate::ai::metrics::MetricsCollector;
    use crate::ai::provider::mock::ScriptedProvider;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedImage(Option<&'static str>);

    #[async_trait]
    impl ImageGenerator for FixedImage {
        async fn generate_image(&self, _prompt: &str) -> Result<ImageResult> {
            match self.0 {
                Some(data) => Ok(ImageResult::from_base64(data.to_string())),
                None => Err(DraftError::LlmApi("503 service unavailable".into())),
            }
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn generator(
        provider: ScriptedProvider,
        images: impl ImageGenerator + 'static,
    ) -> AssetGenerator {
        AssetGenerator::new(
            Arc::new(provider),
            Arc::new(images),
            Arc::new(MetricsCollector::new("run")),
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_generate_cover() {
        let assets = generator(
            ScriptedProvider::constant("\"A lighthouse at dusk\""),
            FixedImage(Some("aGVsbG8=")),
        );
        let cover = assets.generate("Title", "Summary").await.unwrap();
        assert_eq!(cover.prompt, "A lighthouse at dusk");
        assert_eq!(cover.image_base64, "aGVsbG8=");
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let image_error = generator(ScriptedProvider::constant("scene"), FixedImage(None));
        assert!(image_error.generate("T", "S").await.is_none());

        let disabled = generator(ScriptedProvider::constant("scene"), DisabledImageGenerator);
        assert!(disabled.generate("T", "S").await.is_none());

        let prompt_error = generator(
            ScriptedProvider::new(|_, _| Err(DraftError::LlmApi("boom".into()))),
            FixedImage(Some("x")),
        );
        assert!(prompt_error.generate("T", "S").await.is_none());

        let empty_prompt = generator(ScriptedProvider::constant("  "), FixedImage(Some("x")));
        assert!(empty_prompt.generate("T", "S").await.is_none());
    }
}
