//! Text and image generation providers.
//!
//! The rest of the system treats a provider as an opaque generator: text in,
//! text out; prompt in, provider-hosted image URLs out. Providers classify
//! their own failures so callers can tell a content-policy refusal apart from
//! an outage.

mod fake;
mod image;
mod openai;

pub use fake::{FakeGenerator, FakeOutcome};
pub use image::{ImageParamError, ImageRequest, ImageSize, ImageStyle};
pub use openai::{OpenAiGenerator, OpenAiSettings};

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Error type for generator operations.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("request rejected by content policy: {0}")]
    ContentPolicy(String),

    #[error("generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("generator request failed: {0}")]
    RequestFailed(String),

    #[error("generator returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("failed to parse generator response: {0}")]
    ParseError(String),

    #[error("generator not configured: {0}")]
    NotConfigured(String),
}

impl GeneratorError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RequestFailed(_) => true,
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            Self::ContentPolicy(_) | Self::ParseError(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// Trait for generation providers.
///
/// Implementations must be thread-safe; the same instance serves concurrent
/// requests without any global lock.
#[async_trait]
pub trait Generator: Send + Sync + fmt::Debug {
    /// Send a prompt and get the model's text response.
    async fn generate_text(&self, prompt: &str) -> Result<String, GeneratorError>;

    /// Generate images and return their temporary, provider-hosted URLs.
    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<String>, GeneratorError>;

    /// Download an image previously returned by [`Generator::generate_image`].
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GeneratorError>;

    /// Provider name (e.g. "openai", "fake").
    fn provider_name(&self) -> &'static str;
}

/// Run a generator call under a caller-supplied deadline.
pub async fn within<T, F>(timeout: Duration, call: F) -> Result<T, GeneratorError>
where
    F: Future<Output = Result<T, GeneratorError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| GeneratorError::Timeout(timeout))?
}
