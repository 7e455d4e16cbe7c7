use thiserror::Error;

/// Everything that can go wrong between an upload and a description.
///
/// Each variant's `Display` output is meant to be shown to the end user
/// as-is, so messages stay free of transport internals.
#[derive(Error, Debug)]
pub enum DescribeError {
    /// The uploaded bytes could not be read or recognized as an image.
    #[error("could not extract base64 image data: {0}")]
    ImageData(String),

    /// No API key in the environment. Distinct from the provider
    /// rejecting a key it was actually given.
    #[error("missing credential: set GEMINI_API_KEY (or API_KEY) in the environment")]
    MissingCredential,

    /// The HTTP exchange itself failed.
    #[error("request to the Gemini API failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Gemini API error {status}: {message}")]
    Provider { status: u16, message: String },

    /// A syntactically valid response that carries no usable text.
    #[error("failed to get a text response from the API")]
    NoTextResponse,
}
