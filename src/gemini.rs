//! Client for the Google Gemini `generateContent` endpoint.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::DescribeError;
use crate::image_input::ImageInput;

pub const MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Instruction sent when the caller does not supply one.
pub const DEFAULT_PROMPT: &str = "Describe this image in detail. \
     What objects are present? What is happening? What is the style?";

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

// Response fields are all defaulted so a partial body parses and fails as
// a missing text response instead of a deserialization error.
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Thin wrapper over the Gemini REST API. Holds the credential explicitly
/// so the service stays testable without environment mutation.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Reads the credential from `GEMINI_API_KEY`, falling back to
    /// `API_KEY`. Absence is a configuration error, caught before any
    /// network call is ever attempted.
    pub fn from_env() -> Result<Self, DescribeError> {
        std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .map(Self::new)
            .map_err(|_| DescribeError::MissingCredential)
    }

    /// Asks the model to describe `image`. Single attempt, no retries;
    /// one outbound POST per invocation.
    pub async fn describe(
        &self,
        image: &ImageInput,
        prompt: &str,
    ) -> Result<String, DescribeError> {
        let payload = build_request(image, prompt);
        let url = format!(
            "{API_BASE}/{MODEL}:generateContent?key={}",
            self.api_key
        );

        debug!(model = MODEL, mime_type = image.mime_type(), "sending describe request");

        let response = self.http.post(&url).json(&payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(%status, "provider rejected the request");
            return Err(DescribeError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_text(body)
    }
}

/// The part order (instruction first, image second) and the nested
/// `inline_data` object are the provider contract; tests pin both.
fn build_request(image: &ImageInput, prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: prompt.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type().to_string(),
                        data: image.as_base64(),
                    },
                },
            ],
        }],
    }
}

/// First non-empty candidate text; anything else is a failure, never an
/// empty-string success.
fn extract_text(response: GenerateContentResponse) -> Result<String, DescribeError> {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .find(|t| !t.is_empty())
        .ok_or(DescribeError::NoTextResponse)
}
