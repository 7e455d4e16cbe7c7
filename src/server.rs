use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::error::DescribeError;
use crate::gemini::{GeminiClient, DEFAULT_PROMPT, MODEL};
use crate::image_input::ImageInput;

#[derive(Clone)]
pub struct AppState {
    pub client: GeminiClient,
}

#[derive(Serialize, Deserialize)]
pub struct DescribeResponse {
    pub description: String,
    pub model: String,
    pub processing_time_ms: u128,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A failure mapped to an HTTP status plus a display-ready message.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<DescribeError> for ApiError {
    fn from(err: DescribeError) -> Self {
        let status = match err {
            DescribeError::ImageData(_) => StatusCode::BAD_REQUEST,
            DescribeError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            DescribeError::Request(_)
            | DescribeError::Provider { .. }
            | DescribeError::NoTextResponse => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/describe", post(describe))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Pulls the `image` file part (and an optional `prompt` text part) out of
/// the form, runs the description service, and reports elapsed time the
/// way the page expects.
async fn describe(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DescribeResponse>, ApiError> {
    let start = Instant::now();

    let mut image: Option<ImageInput> = None;
    let mut prompt = DEFAULT_PROMPT.to_string();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed upload: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| DescribeError::ImageData(e.to_string()))?;
                image = Some(ImageInput::new(bytes.to_vec(), mime.as_deref())?);
            }
            Some("prompt") => {
                if let Ok(text) = field.text().await {
                    if !text.trim().is_empty() {
                        prompt = text;
                    }
                }
            }
            _ => {}
        }
    }

    // The page disables the button until a file is picked; this guard
    // covers callers that skip the page.
    let image = image.ok_or_else(|| ApiError::bad_request("no image selected"))?;

    let description = state.client.describe(&image, &prompt).await.map_err(|e| {
        warn!("describe failed: {e}");
        ApiError::from(e)
    })?;

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "described image");

    Ok(Json(DescribeResponse {
        description,
        model: MODEL.to_string(),
        processing_time_ms: start.elapsed().as_millis(),
    }))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AI Photo Recognizer</title>
    <style>
        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #111827;
            color: #e5e7eb;
            min-height: 100vh;
            display: flex;
            flex-direction: column;
        }

        header {
            padding: 18px;
            text-align: center;
            border-bottom: 1px solid #1f2937;
        }

        header h1 { font-size: 1.8em; letter-spacing: 1px; }
        header p { color: #9ca3af; margin-top: 4px; font-size: 0.9em; }

        main {
            flex: 1;
            display: grid;
            grid-template-columns: 1fr 1fr;
            gap: 24px;
            max-width: 1100px;
            width: 100%;
            margin: 0 auto;
            padding: 32px 20px;
        }

        @media (max-width: 768px) {
            main { grid-template-columns: 1fr; }
        }

        .upload-area {
            border: 2px dashed #4b5563;
            border-radius: 12px;
            background: #1f2937;
            min-height: 280px;
            display: flex;
            flex-direction: column;
            align-items: center;
            justify-content: center;
            text-align: center;
            cursor: pointer;
            padding: 20px;
            transition: background 0.2s, border-color 0.2s;
        }

        .upload-area:hover, .upload-area.dragover {
            background: #273244;
            border-color: #3b82f6;
        }

        .upload-area img {
            max-width: 100%;
            max-height: 280px;
            object-fit: contain;
            border-radius: 8px;
        }

        .upload-hint { color: #9ca3af; font-size: 0.9em; margin-top: 8px; }
        .upload-text strong { color: #3b82f6; }

        input[type="file"] { display: none; }

        button {
            width: 100%;
            margin-top: 16px;
            padding: 14px;
            border: none;
            border-radius: 10px;
            background: #3b82f6;
            color: white;
            font-size: 1em;
            font-weight: 700;
            cursor: pointer;
        }

        button:hover:not(:disabled) { background: #2563eb; }
        button:disabled { background: #4b5563; cursor: not-allowed; }

        .result-pane {
            background: #1f2937;
            border-radius: 12px;
            padding: 24px;
            min-height: 280px;
        }

        .result-pane h2 {
            font-size: 1.1em;
            padding-bottom: 10px;
            margin-bottom: 14px;
            border-bottom: 1px solid #374151;
        }

        .placeholder { color: #9ca3af; }
        .description { white-space: pre-wrap; line-height: 1.6; }
        .error { color: #f87171; }

        .skeleton { display: none; }
        .skeleton div {
            height: 14px;
            border-radius: 6px;
            background: #374151;
            margin-bottom: 12px;
            animation: pulse 1.2s ease-in-out infinite;
        }
        .skeleton div:nth-child(1) { width: 75%; }
        .skeleton div:nth-child(2) { width: 100%; }
        .skeleton div:nth-child(3) { width: 85%; }
        .skeleton div:nth-child(4) { width: 50%; }

        @keyframes pulse {
            0%, 100% { opacity: 1; }
            50% { opacity: 0.4; }
        }

        footer {
            text-align: center;
            padding: 16px;
            color: #6b7280;
            font-size: 0.85em;
            border-top: 1px solid #1f2937;
        }
    </style>
</head>
<body>
    <header>
        <h1>AI Photo Recognizer</h1>
        <p>Powered by Gemini</p>
    </header>

    <main>
        <div>
            <label class="upload-area" id="uploadArea" for="fileInput">
                <div id="uploadPrompt">
                    <div style="font-size:3em">&#128247;</div>
                    <div class="upload-text"><strong>Click to upload</strong> or drag and drop</div>
                    <div class="upload-hint">PNG, JPG, GIF or WEBP</div>
                </div>
                <img id="previewImage" alt="Preview" hidden>
                <input type="file" id="fileInput" accept="image/*">
            </label>
            <button id="recognizeBtn" disabled>&#10024; Recognize Image</button>
        </div>

        <div class="result-pane">
            <h2>AI Analysis</h2>
            <div class="skeleton" id="skeleton">
                <div></div><div></div><div></div><div></div>
            </div>
            <p class="placeholder" id="placeholder">Upload an image and click "Recognize" to see the AI's analysis here.</p>
            <p class="error" id="errorText" hidden></p>
            <p class="description" id="descriptionText" hidden></p>
        </div>
    </main>

    <footer>&copy; AI Photo Recognizer. All rights reserved.</footer>

    <script>
        const uploadArea = document.getElementById('uploadArea');
        const uploadPrompt = document.getElementById('uploadPrompt');
        const fileInput = document.getElementById('fileInput');
        const previewImage = document.getElementById('previewImage');
        const recognizeBtn = document.getElementById('recognizeBtn');
        const skeleton = document.getElementById('skeleton');
        const placeholder = document.getElementById('placeholder');
        const errorText = document.getElementById('errorText');
        const descriptionText = document.getElementById('descriptionText');

        let selectedFile = null;

        function selectFile(file) {
            if (!file || !file.type.startsWith('image/')) return;
            selectedFile = file;
            previewImage.src = URL.createObjectURL(file);
            previewImage.hidden = false;
            uploadPrompt.hidden = true;
            descriptionText.hidden = true;
            errorText.hidden = true;
            placeholder.hidden = false;
            recognizeBtn.disabled = false;
        }

        fileInput.addEventListener('change', (e) => selectFile(e.target.files[0]));

        uploadArea.addEventListener('dragover', (e) => {
            e.preventDefault();
            uploadArea.classList.add('dragover');
        });
        uploadArea.addEventListener('dragleave', () => uploadArea.classList.remove('dragover'));
        uploadArea.addEventListener('drop', (e) => {
            e.preventDefault();
            uploadArea.classList.remove('dragover');
            selectFile(e.dataTransfer.files[0]);
        });

        recognizeBtn.addEventListener('click', async () => {
            if (!selectedFile) {
                errorText.textContent = 'Please select an image first.';
                errorText.hidden = false;
                return;
            }

            recognizeBtn.disabled = true;
            placeholder.hidden = true;
            errorText.hidden = true;
            descriptionText.hidden = true;
            skeleton.style.display = 'block';

            const formData = new FormData();
            formData.append('image', selectedFile);

            try {
                const response = await fetch('/describe', { method: 'POST', body: formData });
                const result = await response.json();
                if (!response.ok) {
                    throw new Error(result.error || 'Upload failed');
                }
                descriptionText.textContent = result.description;
                descriptionText.hidden = false;
            } catch (err) {
                errorText.textContent = 'An error occurred: ' + err.message;
                errorText.hidden = false;
            } finally {
                skeleton.style.display = 'none';
                recognizeBtn.disabled = false;
            }
        });
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{
        body::Body,
        http::{self, Request},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-boundary";

    fn test_app() -> Router {
        let state = Arc::new(AppState {
            client: GeminiClient::new("test-key"),
        });
        app(state)
    }

    fn multipart_body(field: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_describe(body: Vec<u8>) -> (StatusCode, serde_json::Value) {
        let req = Request::builder()
            .uri("/describe")
            .method(http::Method::POST)
            .header(
                http::header::CONTENT_TYPE,
                format!("{}; boundary={BOUNDARY}", mime::MULTIPART_FORM_DATA),
            )
            .body(Body::from(body))
            .unwrap();

        let resp = test_app().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn index_serves_the_page() {
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();
        let resp = test_app().oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let page = std::str::from_utf8(&body).unwrap();
        assert!(page.contains("Recognize Image"));
    }

    #[tokio::test]
    async fn describe_without_an_image_part_is_rejected() {
        let body = multipart_body("attachment", "notes.txt", "text/plain", b"not an image");
        let (status, json) = post_describe(body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "no image selected");
    }

    #[tokio::test]
    async fn corrupt_upload_fails_before_any_network_call() {
        // A dummy credential plus a local-only router: reaching the
        // provider would fail loudly, so a clean 400 proves the request
        // never left the handler.
        let body = multipart_body("image", "broken.png", "image/png", &[0x00, 0x01, 0x02]);
        let (status, json) = post_describe(body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = json["error"].as_str().unwrap();
        assert!(message.contains("image data"), "got: {message}");
    }

    #[tokio::test]
    async fn empty_upload_fails_before_any_network_call() {
        let body = multipart_body("image", "empty.png", "image/png", b"");
        let (status, json) = post_describe(body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("image data"));
    }
}
