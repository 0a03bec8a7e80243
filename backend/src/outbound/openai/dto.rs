//! Images API response bodies.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct ImageDataDto {
    #[serde(default)]
    pub b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImagesResponseDto {
    #[serde(default)]
    pub data: Vec<ImageDataDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiErrorDto {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub error: ApiErrorDto,
}

/// Outcome of decoding the first returned image.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum FirstImage {
    Bytes(Vec<u8>),
    Missing,
    Invalid(String),
}

impl ImagesResponseDto {
    pub fn first_image(&self) -> FirstImage {
        let Some(encoded) = self
            .data
            .first()
            .and_then(|item| item.b64_json.as_deref())
            .filter(|encoded| !encoded.is_empty())
        else {
            return FirstImage::Missing;
        };
        match STANDARD.decode(encoded) {
            Ok(bytes) if bytes.is_empty() => FirstImage::Missing,
            Ok(bytes) => FirstImage::Bytes(bytes),
            Err(err) => FirstImage::Invalid(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn response(value: serde_json::Value) -> ImagesResponseDto {
        serde_json::from_value(value).expect("decode")
    }

    #[test]
    fn decodes_first_image() {
        let body = response(json!({"data": [{"b64_json": "AQID"}, {"b64_json": "BA=="}]}));
        assert_eq!(body.first_image(), FirstImage::Bytes(vec![1, 2, 3]));
    }

    #[rstest]
    #[case(json!({"data": []}))]
    #[case(json!({}))]
    #[case(json!({"data": [{"url": "https://example.invalid/x.png"}]}))]
    #[case(json!({"data": [{"b64_json": ""}]}))]
    fn missing_image_data(#[case] value: serde_json::Value) {
        assert_eq!(response(value).first_image(), FirstImage::Missing);
    }

    #[test]
    fn invalid_base64_is_reported() {
        let body = response(json!({"data": [{"b64_json": "not base64!"}]}));
        assert!(matches!(body.first_image(), FirstImage::Invalid(_)));
    }
}
