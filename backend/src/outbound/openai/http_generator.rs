//! Reqwest-backed `ImageGenerator` calling `POST /images/edits`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{ErrorEnvelopeDto, FirstImage, ImagesResponseDto};
use crate::domain::ports::{
    GeneratedImage, GenerationRequest, ImageGenerator, ImageGeneratorError,
};

const DEFAULT_MODEL: &str = "gpt-image-1";
const UPLOAD_FILE_NAME: &str = "image.jpeg";

/// Model selection and credentials for the Images API.
pub struct OpenAiIdentity {
    pub api_key: Zeroizing<String>,
    pub model: String,
}

impl OpenAiIdentity {
    pub fn new(api_key: Zeroizing<String>) -> Self {
        Self {
            api_key,
            model: DEFAULT_MODEL.to_owned(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

pub struct OpenAiHttpGenerator {
    client: Client,
    endpoint: Url,
    identity: OpenAiIdentity,
}

impl OpenAiHttpGenerator {
    /// Build a generator against `api_base` (normally `https://api.openai.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or the
    /// endpoint URL is invalid.
    pub fn new(
        api_base: &Url,
        identity: OpenAiIdentity,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = Client::builder().timeout(timeout).build()?;
        let base = api_base.as_str().trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/images/edits"))?;
        Ok(Self {
            client,
            endpoint,
            identity,
        })
    }

    fn form(&self, request: &GenerationRequest) -> Result<Form, ImageGeneratorError> {
        let image = Part::bytes(request.image.clone())
            .file_name(UPLOAD_FILE_NAME)
            .mime_str("image/jpeg")
            .map_err(map_transport_error)?;
        Ok(Form::new()
            .text("model", self.identity.model.clone())
            .part("image", image)
            .text("prompt", request.prompt.clone())
            .text("n", "1")
            .text("size", request.size.clone())
            .text("quality", request.quality.clone()))
    }
}

fn map_transport_error(error: reqwest::Error) -> ImageGeneratorError {
    if error.is_timeout() {
        ImageGeneratorError::timeout(error.to_string())
    } else {
        ImageGeneratorError::transport(error.to_string())
    }
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorEnvelopeDto>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).chars().take(160).collect())
}

fn map_status_error(status: StatusCode, body: &[u8]) -> ImageGeneratorError {
    let message = error_message(body);
    match status {
        StatusCode::TOO_MANY_REQUESTS => ImageGeneratorError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ImageGeneratorError::timeout(message)
        }
        _ if status.is_server_error() => ImageGeneratorError::transport(message),
        _ => ImageGeneratorError::rejected(status.as_u16(), message),
    }
}

fn parse_image(body: &[u8]) -> Result<GeneratedImage, ImageGeneratorError> {
    let decoded: ImagesResponseDto = serde_json::from_slice(body)
        .map_err(|err| ImageGeneratorError::decode(format!("invalid images JSON: {err}")))?;
    match decoded.first_image() {
        FirstImage::Bytes(bytes) => Ok(GeneratedImage { bytes }),
        FirstImage::Missing => Err(ImageGeneratorError::empty_result()),
        FirstImage::Invalid(reason) => Err(ImageGeneratorError::decode(format!(
            "invalid base64 image: {reason}"
        ))),
    }
}

#[async_trait]
impl ImageGenerator for OpenAiHttpGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, ImageGeneratorError> {
        debug!(order_id = %request.order_id, model = %self.identity.model, "requesting image edit");
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.identity.api_key.as_str())
            .multipart(self.form(request)?)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        parse_image(body.as_ref())
    }
}
