//! Driven port for the image-generation service.
//!
//! The domain owns the request shape so the fulfillment worker stays
//! independent of any particular provider.

use async_trait::async_trait;

use crate::domain::OrderId;

use super::define_port_error;

/// One image-edit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Order being fulfilled, for trace correlation.
    pub order_id: OrderId,
    pub prompt: String,
    /// Source photo bytes (JPEG).
    pub image: Vec<u8>,
    /// Output dimensions such as `1024x1024`.
    pub size: String,
    pub quality: String,
}

/// Decoded generator output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
}

define_port_error! {
    /// Errors surfaced while calling the generator.
    pub enum ImageGeneratorError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "image generator transport failed: {message}" [retryable],
        /// The call exceeded its timeout.
        Timeout { message: String } =>
            "image generator timeout: {message}" [retryable],
        /// The provider rate-limited the request.
        RateLimited { message: String } =>
            "image generator rate limited request: {message}" [retryable],
        /// The provider refused the request.
        Rejected { status: u16, message: String } =>
            "image generator rejected request with status {status}: {message}",
        /// The response carried no image data.
        EmptyResult =>
            "image generator returned no image data",
        /// The response could not be decoded.
        Decode { message: String } =>
            "image generator response decode failed: {message}",
    }
}

/// Port for producing a stylized image from a photo.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, ImageGeneratorError>;
}
