//! Chat-completion client that turns a captured image into HTML/LaTeX and Markdown.
//!
//! Speaks the OpenAI-compatible `POST {base}/chat/completions` shape: one user turn carrying the
//! extraction prompt and the image as a base64 data URL. The API key comes from `OPENAI_API_KEY`;
//! base URL, model, token limit and timeout come from config (see `config::FullConfig`).
//! One request per call, no retry, no caching.

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::FullConfig;
use crate::extraction::ExtractionResult;

const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Instruction sent with every image. The reply contract is HTML, a `---` line, then Markdown.
pub const EXTRACTION_PROMPT: &str = "Transcribe the content of this image twice. \
First output only the direct HTML with LaTeX math notation: use \\[...\\] for display math and \
\\(...\\) for inline math, and HTML paragraphs for text. \
Then output a line containing only ---. \
Then output the same content as Markdown, using $...$ for inline math and $$...$$ for display math. \
Do not include any meta commentary or markdown code blocks.";

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Failed to read image {path}: {source}")]
    ReadImage {
        path: String,
        source: std::io::Error,
    },
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("Request failed: {0}")]
    RequestFailed(String),
}

/// Anything that can turn an image on disk into an extraction. Implemented by
/// [`InferenceClient`]; the capture flow is generic over it.
pub trait ImageExtractor {
    fn extract(
        &self,
        image_path: &Path,
    ) -> impl Future<Output = Result<ExtractionResult, InferenceError>> + Send;
}

// --- Wire types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: [ContentPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// --- Client ---

pub struct InferenceClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl InferenceClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Option<Duration>,
    ) -> Result<Self, InferenceError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| InferenceError::RequestFailed(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            max_tokens,
        })
    }

    /// Builds a client from config plus the `OPENAI_API_KEY` environment variable.
    pub fn from_config(cfg: &FullConfig) -> Result<Self, InferenceError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(InferenceError::MissingApiKey)?;
        Self::new(
            &cfg.api_base_url(),
            api_key,
            cfg.model(),
            cfg.max_tokens(),
            cfg.request_timeout_secs.map(Duration::from_secs),
        )
    }

    async fn request(&self, image_path: &Path) -> Result<ExtractionResult, InferenceError> {
        let bytes = std::fs::read(image_path).map_err(|source| InferenceError::ReadImage {
            path: image_path.display().to_string(),
            source,
        })?;
        let data_url = image_data_url(&bytes);

        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: [
                    ContentPart::Text {
                        text: EXTRACTION_PROMPT,
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: &data_url },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        };

        info!(
            model = %self.model,
            image_bytes = bytes.len(),
            "Sending image to inference API"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                InferenceError::RequestFailed(format!(
                    "Could not reach {}: {}",
                    self.endpoint, e
                ))
            })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| InferenceError::RequestFailed(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|r| r.error)
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("HTTP {}: {}", status, text));
            return Err(InferenceError::RequestFailed(message));
        }

        let content = parse_completion(&text)?;
        debug!(len = content.len(), "Received completion");
        Ok(ExtractionResult::from_response_text(&content))
    }
}

impl ImageExtractor for InferenceClient {
    async fn extract(&self, image_path: &Path) -> Result<ExtractionResult, InferenceError> {
        self.request(image_path).await
    }
}

/// Builds an [`InferenceClient`] from config on every call, so a missing API key surfaces as an
/// extraction error (and thus as the preview placeholder) instead of blocking the capture.
pub struct ConfiguredClient {
    config: FullConfig,
}

impl ConfiguredClient {
    pub fn new(config: FullConfig) -> Self {
        Self { config }
    }
}

impl ImageExtractor for ConfiguredClient {
    async fn extract(&self, image_path: &Path) -> Result<ExtractionResult, InferenceError> {
        InferenceClient::from_config(&self.config)?
            .request(image_path)
            .await
    }
}

/// Encodes image bytes as a `data:` URL, sniffing the MIME type and defaulting to PNG.
pub fn image_data_url(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|f| f.to_mime_type())
        .unwrap_or("image/png");
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Pulls the first choice's text out of a successful response body.
fn parse_completion(body: &str) -> Result<String, InferenceError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| InferenceError::RequestFailed(format!("Invalid response: {}", e)))?;
    let first = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::RequestFailed("Response contained no choices".to_string()))?;
    first
        .message
        .content
        .ok_or_else(|| InferenceError::RequestFailed("First choice had no content".to_string()))
}
