//! Reqwest-backed `Messenger` speaking the Telegram Bot API.
//!
//! The bot token is embedded in every request URL, so transport errors are
//! stripped of their URL before they reach logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use zeroize::Zeroizing;

use super::dto::{
    AnswerCallbackRequest, AnswerPreCheckoutRequest, ApiResponse, FileDto, GetFileRequest,
    SendInvoiceRequest, SendMessageRequest,
};
use crate::domain::Invoice;
use crate::domain::ports::{
    CallbackAnswer, DownloadedFile, Messenger, MessengerError, OutgoingMessage, OutgoingPhoto,
    PreCheckoutAnswer,
};

pub struct TelegramHttpMessenger {
    client: Client,
    api_base: Url,
    token: Zeroizing<String>,
}

impl TelegramHttpMessenger {
    /// Build a client for `api_base` (normally `https://api.telegram.org`).
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        api_base: Url,
        token: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base,
            token,
        })
    }

    fn method_url(&self, method: &str) -> Result<Url, MessengerError> {
        self.join(&format!("bot{}/{method}", self.token.as_str()))
    }

    fn file_url(&self, file_path: &str) -> Result<Url, MessengerError> {
        self.join(&format!("file/bot{}/{file_path}", self.token.as_str()))
    }

    fn join(&self, path: &str) -> Result<Url, MessengerError> {
        let base = self.api_base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|err| MessengerError::decode(format!("invalid Bot API url: {err}")))
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, MessengerError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.method_url(method)?)
            .json(body)
            .send()
            .await
            .map_err(map_transport_error)?;
        read_envelope(method, response).await
    }
}

async fn read_envelope<T: DeserializeOwned>(
    method: &str,
    response: reqwest::Response,
) -> Result<T, MessengerError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_transport_error)?;
    let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|err| {
        if status.is_success() {
            MessengerError::decode(format!("{method}: {err}"))
        } else {
            map_status_error(status, &String::from_utf8_lossy(&body))
        }
    })?;
    if !envelope.ok || !status.is_success() {
        let code = envelope
            .error_code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(status);
        let description = envelope.description.unwrap_or_default();
        return Err(map_status_error(code, &format!("{method}: {description}")));
    }
    envelope
        .result
        .ok_or_else(|| MessengerError::decode(format!("{method}: response has no result")))
}

fn map_transport_error(error: reqwest::Error) -> MessengerError {
    let error = error.without_url();
    if error.is_timeout() {
        MessengerError::timeout(error.to_string())
    } else {
        MessengerError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, message: &str) -> MessengerError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => MessengerError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            MessengerError::timeout(message)
        }
        _ if status.is_server_error() => MessengerError::transport(message),
        _ => MessengerError::api(status.as_u16(), message),
    }
}

/// Last path component of a Bot API file path.
fn file_name_of(file_path: &str) -> String {
    file_path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(file_path)
        .to_owned()
}

#[async_trait]
impl Messenger for TelegramHttpMessenger {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), MessengerError> {
        let _: serde_json::Value = self
            .call("sendMessage", &SendMessageRequest::from(message))
            .await?;
        Ok(())
    }

    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), MessengerError> {
        let _: bool = self
            .call("answerCallbackQuery", &AnswerCallbackRequest::from(answer))
            .await?;
        Ok(())
    }

    async fn send_invoice(&self, invoice: &Invoice) -> Result<(), MessengerError> {
        let _: serde_json::Value = self
            .call("sendInvoice", &SendInvoiceRequest::from(invoice))
            .await?;
        Ok(())
    }

    async fn answer_pre_checkout(
        &self,
        answer: &PreCheckoutAnswer,
    ) -> Result<(), MessengerError> {
        let _: bool = self
            .call("answerPreCheckoutQuery", &AnswerPreCheckoutRequest::from(answer))
            .await?;
        Ok(())
    }

    async fn send_photo(&self, photo: &OutgoingPhoto) -> Result<(), MessengerError> {
        let part = Part::bytes(photo.bytes.clone())
            .file_name(photo.file_name.clone())
            .mime_str("image/jpeg")
            .map_err(map_transport_error)?;
        let mut form = Form::new()
            .text("chat_id", photo.chat_id.to_string())
            .part("photo", part);
        if let Some(caption) = &photo.caption {
            form = form.text("caption", caption.clone());
        }
        if let Some(mode) = photo.parse_mode {
            form = form.text("parse_mode", mode.as_str());
        }

        let response = self
            .client
            .post(self.method_url("sendPhoto")?)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport_error)?;
        let _: serde_json::Value = read_envelope("sendPhoto", response).await?;
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, MessengerError> {
        let file: FileDto = self.call("getFile", &GetFileRequest { file_id }).await?;
        let file_path = file
            .file_path
            .filter(|path| !path.is_empty())
            .ok_or_else(|| MessengerError::missing_file_path(file_id))?;

        let response = self
            .client
            .get(self.file_url(&file_path)?)
            .send()
            .await
            .map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(map_status_error(status, &format!("download {file_path}")));
        }
        let bytes = response.bytes().await.map_err(map_transport_error)?;
        debug!(file_id, size = bytes.len(), "downloaded file");
        Ok(DownloadedFile {
            file_name: file_name_of(&file_path),
            bytes: bytes.to_vec(),
        })
    }
}
