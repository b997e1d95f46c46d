//! AI Integration Layer
//!
//! Completion and image collaborators plus the plumbing around them:
//! prompts, timeouts, output parsing and metrics.

pub mod image;
pub mod metrics;
pub mod prompt;
pub mod provider;
pub mod timeout;
pub mod validation;

pub use image::{
    DisabledImageGenerator, ImageGenerator, ImageResult, OpenAiImageGenerator,
    SharedImageGenerator, create_image_generator,
};
pub use metrics::{MetricsCollector, MetricsSummary, SharedMetrics, StageMetrics};
pub use prompt::{PromptBuilder, PromptSection, PromptTemplates, render_template};
pub use provider::{
    CompletionRequest, LlmProvider, LlmResponse, OllamaProvider, OpenAiProvider, ProviderConfig,
    ResponseMetadata, ResponseTiming, RetryConfig, RetryingProvider, SharedProvider, TokenUsage,
    create_provider,
};
pub use timeout::{TimeoutConfig, with_timeout};
pub use validation::{JsonRepairer, ParseProvenance, extract_json_from_response};
