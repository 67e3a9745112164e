//! OpenAI-compatible generation provider (OpenAI, Azure OpenAI proxies).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Generator, GeneratorError, ImageRequest};

/// Error codes the provider uses when it refuses a prompt.
const CONTENT_POLICY_CODES: &[&str] = &["content_policy_violation", "content_filter"];

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: String,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug)]
pub struct OpenAiGenerator {
    settings: OpenAiSettings,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings) -> Self {
        Self {
            settings,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.settings.base_url.trim_end_matches('/'))
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, GeneratorError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .bearer_auth(&self.settings.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;

        if status != 200 {
            return Err(classify_error(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| GeneratorError::ParseError(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageGenerationRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: String,
    style: &'a str,
    response_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    code: Option<String>,
}

/// Map a non-200 provider response onto a [`GeneratorError`].
fn classify_error(status: u16, body: &str) -> GeneratorError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(parsed) => {
            let refused = parsed
                .error
                .code
                .as_deref()
                .is_some_and(|code| CONTENT_POLICY_CODES.contains(&code));
            if refused {
                GeneratorError::ContentPolicy(parsed.error.message)
            } else {
                GeneratorError::ApiError {
                    status,
                    message: parsed.error.message,
                }
            }
        }
        Err(_) => GeneratorError::ApiError {
            status,
            message: body.to_string(),
        },
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String, GeneratorError> {
        let request = ChatRequest {
            model: &self.settings.text_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response: ChatResponse = self.post("chat/completions", &request).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GeneratorError::ParseError("no choices in response".into()))?;

        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(GeneratorError::ContentPolicy(
                "completion stopped by content filter".into(),
            ));
        }

        choice
            .message
            .content
            .ok_or_else(|| GeneratorError::ParseError("choice has no text content".into()))
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<Vec<String>, GeneratorError> {
        let body = ImageGenerationRequest {
            model: &self.settings.image_model,
            prompt: &request.prompt,
            n: 1,
            size: request.size.to_string(),
            style: request.style.as_str(),
            response_format: "url",
        };

        let response: ImageGenerationResponse = self.post("images/generations", &body).await?;
        Ok(response.data.into_iter().filter_map(|d| d.url).collect())
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GeneratorError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(GeneratorError::ApiError {
                status,
                message: format!("image download failed for {url}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GeneratorError::RequestFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
