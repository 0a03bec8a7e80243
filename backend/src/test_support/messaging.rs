//! Recording messenger and scripted image generator.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::Invoice;
use crate::domain::ports::{
    CallbackAnswer, DownloadedFile, GeneratedImage, GenerationRequest, ImageGenerator,
    ImageGeneratorError, Messenger, MessengerError, OutgoingMessage, OutgoingPhoto,
    PreCheckoutAnswer,
};

use super::lock;

/// Messenger that records every call and serves files from a map.
#[derive(Default)]
pub struct RecordingMessenger {
    messages: Mutex<Vec<OutgoingMessage>>,
    callbacks: Mutex<Vec<CallbackAnswer>>,
    invoices: Mutex<Vec<Invoice>>,
    pre_checkout: Mutex<Vec<PreCheckoutAnswer>>,
    photos: Mutex<Vec<OutgoingPhoto>>,
    files: Mutex<HashMap<String, DownloadedFile>>,
    photo_failures: Mutex<VecDeque<MessengerError>>,
}

impl RecordingMessenger {
    /// Serve `bytes` for `file_id` as `file_name`.
    pub fn with_file(self, file_id: &str, file_name: &str, bytes: Vec<u8>) -> Self {
        lock(&self.files).insert(
            file_id.to_owned(),
            DownloadedFile {
                file_name: file_name.to_owned(),
                bytes,
            },
        );
        self
    }

    /// Fail the next `send_photo` call with `error`.
    pub fn fail_next_photo(&self, error: MessengerError) {
        lock(&self.photo_failures).push_back(error);
    }

    pub fn messages(&self) -> Vec<OutgoingMessage> {
        lock(&self.messages).clone()
    }

    pub fn callbacks(&self) -> Vec<CallbackAnswer> {
        lock(&self.callbacks).clone()
    }

    pub fn invoices(&self) -> Vec<Invoice> {
        lock(&self.invoices).clone()
    }

    pub fn pre_checkout_answers(&self) -> Vec<PreCheckoutAnswer> {
        lock(&self.pre_checkout).clone()
    }

    pub fn photos(&self) -> Vec<OutgoingPhoto> {
        lock(&self.photos).clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), MessengerError> {
        lock(&self.messages).push(message.clone());
        Ok(())
    }

    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), MessengerError> {
        lock(&self.callbacks).push(answer.clone());
        Ok(())
    }

    async fn send_invoice(&self, invoice: &Invoice) -> Result<(), MessengerError> {
        lock(&self.invoices).push(invoice.clone());
        Ok(())
    }

    async fn answer_pre_checkout(
        &self,
        answer: &PreCheckoutAnswer,
    ) -> Result<(), MessengerError> {
        lock(&self.pre_checkout).push(answer.clone());
        Ok(())
    }

    async fn send_photo(&self, photo: &OutgoingPhoto) -> Result<(), MessengerError> {
        if let Some(error) = lock(&self.photo_failures).pop_front() {
            return Err(error);
        }
        lock(&self.photos).push(photo.clone());
        Ok(())
    }

    async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, MessengerError> {
        lock(&self.files)
            .get(file_id)
            .cloned()
            .ok_or_else(|| MessengerError::missing_file_path(file_id))
    }
}

/// Generator replaying scripted results, then succeeding with fixed bytes.
pub struct ScriptedImageGenerator {
    scripted: Mutex<VecDeque<Result<GeneratedImage, ImageGeneratorError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    fallback: Vec<u8>,
}

impl ScriptedImageGenerator {
    /// Always succeed with `bytes`.
    pub fn succeeding(bytes: Vec<u8>) -> Self {
        Self::scripted(Vec::new(), bytes)
    }

    pub fn scripted(
        scripted: Vec<Result<GeneratedImage, ImageGeneratorError>>,
        fallback: Vec<u8>,
    ) -> Self {
        Self {
            scripted: Mutex::new(scripted.into()),
            requests: Mutex::new(Vec::new()),
            fallback,
        }
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImageGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, ImageGeneratorError> {
        lock(&self.requests).push(request.clone());
        lock(&self.scripted).pop_front().unwrap_or_else(|| {
            Ok(GeneratedImage {
                bytes: self.fallback.clone(),
            })
        })
    }
}
