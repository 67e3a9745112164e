//! Scripted generator for tests and offline runs.
//!
//! Responses are queued per operation and consumed in order; once a queue is
//! empty the configured default applies.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{Generator, GeneratorError, ImageRequest};

/// 1x1 transparent PNG returned by [`Generator::fetch_image`].
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

const DEFAULT_IMAGE_URL: &str = "https://images.invalid/generated/fake.png";

/// One scripted result.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Text reply, or a single image URL for image calls.
    Reply(String),
    /// Empty text, or no image URLs.
    Empty,
    /// Content-policy rejection.
    Refuse,
    /// Never completes; exercises caller timeouts.
    Stall,
    /// Transport failure.
    Fail(String),
}

#[derive(Debug)]
pub struct FakeGenerator {
    text: Mutex<VecDeque<FakeOutcome>>,
    default_text: Option<String>,
    images: Mutex<VecDeque<FakeOutcome>>,
    last_prompt: Mutex<Option<String>>,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl Default for FakeGenerator {
    fn default() -> Self {
        Self::new().with_default_text(
            "### Fake Toast\n\n#### Ingredients:\n- 1 slice bread\n\n#### Instructions:\n1. Toast the bread.",
        )
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeGenerator {
    /// A generator with no scripted responses and no default text.
    pub fn new() -> Self {
        Self {
            text: Mutex::new(VecDeque::new()),
            default_text: None,
            images: Mutex::new(VecDeque::new()),
            last_prompt: Mutex::new(None),
            text_calls: AtomicUsize::new(0),
            image_calls: AtomicUsize::new(0),
        }
    }

    /// Set the text returned when no scripted outcome is queued.
    pub fn with_default_text(mut self, text: &str) -> Self {
        self.default_text = Some(text.to_string());
        self
    }

    /// Queue the outcome of the next text call.
    pub fn push_text(&self, outcome: FakeOutcome) {
        lock(&self.text).push_back(outcome);
    }

    /// Queue the outcome of the next image call.
    pub fn push_image(&self, outcome: FakeOutcome) {
        lock(&self.images).push_back(outcome);
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt seen by either operation.
    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.last_prompt).clone()
    }

    fn record_prompt(&self, prompt: &str) {
        *lock(&self.last_prompt) = Some(prompt.to_string());
    }
}

async fn resolve<T>(
    outcome: FakeOutcome,
    reply: impl FnOnce(String) -> T,
    empty: T,
) -> Result<T, GeneratorError> {
    match outcome {
        FakeOutcome::Reply(value) => Ok(reply(value)),
        FakeOutcome::Empty => Ok(empty),
        FakeOutcome::Refuse => Err(GeneratorError::ContentPolicy(
            "FakeGenerator: scripted refusal".into(),
        )),
        FakeOutcome::Stall => std::future::pending().await,
        FakeOutcome::Fail(message) => Err(GeneratorError::RequestFailed(message)),
    }
}

#[async_trait]
impl Generator for FakeGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String, GeneratorError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.record_prompt(prompt);

        let scripted = lock(&self.text).pop_front();
        let outcome = match (scripted, &self.default_text) {
            (Some(outcome), _) => outcome,
            (None, Some(text)) => FakeOutcome::Reply(text.clone()),
            (None, None) => {
                return Err(GeneratorError::RequestFailed(format!(
                    "FakeGenerator: no response configured for prompt (first 100 chars): {}",
                    prompt.chars().take(100).collect::<String>()
                )));
            }
        };
        resolve(outcome, |text| text, String::new()).await
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<String>, GeneratorError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.record_prompt(&request.prompt);

        let outcome = lock(&self.images)
            .pop_front()
            .unwrap_or_else(|| FakeOutcome::Reply(DEFAULT_IMAGE_URL.to_string()));
        resolve(outcome, |url| vec![url], Vec::new()).await
    }

    async fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, GeneratorError> {
        Ok(PLACEHOLDER_PNG.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}
