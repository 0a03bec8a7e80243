//! Driven port for the messaging platform.
//!
//! Handlers receive a [`Messenger`] capability instead of a global bot
//! client; every outbound Bot API call goes through it.

use async_trait::async_trait;

use crate::domain::{ChatId, Invoice};

use super::define_port_error;

/// Text formatting applied by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Markdown,
}

impl ParseMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "Markdown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

/// Inline keyboard laid out as rows of buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// Lay `buttons` out `per_row` to a row.
    pub fn in_rows(buttons: Vec<InlineButton>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let rows = buttons
            .chunks(per_row)
            .map(<[InlineButton]>::to_vec)
            .collect();
        Self { rows }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: ChatId,
    pub text: String,
    pub parse_mode: Option<ParseMode>,
    pub keyboard: Option<InlineKeyboard>,
}

impl OutgoingMessage {
    /// Plain text message.
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: None,
            keyboard: None,
        }
    }

    /// Markdown formatted message.
    pub fn markdown(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            parse_mode: Some(ParseMode::Markdown),
            ..Self::text(chat_id, text)
        }
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// Photo upload with an optional caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingPhoto {
    pub chat_id: ChatId,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub caption: Option<String>,
    pub parse_mode: Option<ParseMode>,
}

/// Reply to an inline-keyboard press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAnswer {
    pub callback_id: String,
    pub text: Option<String>,
}

/// Reply to a pre-checkout query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreCheckoutAnswer {
    pub query_id: String,
    pub ok: bool,
    /// Required by the platform when `ok` is false.
    pub error_message: Option<String>,
}

impl PreCheckoutAnswer {
    pub fn accept(query_id: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            ok: true,
            error_message: None,
        }
    }

    pub fn reject(query_id: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            query_id: query_id.into(),
            ok: false,
            error_message: Some(error_message.into()),
        }
    }
}

/// File fetched from the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Final component of the platform's file path.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

define_port_error! {
    /// Errors surfaced while calling the messaging platform.
    pub enum MessengerError {
        /// Network transport failed before receiving a response.
        Transport { message: String } =>
            "messenger transport failed: {message}" [retryable],
        /// The call exceeded its timeout.
        Timeout { message: String } =>
            "messenger timeout: {message}" [retryable],
        /// The platform rate-limited the request.
        RateLimited { message: String } =>
            "messenger rate limited request: {message}" [retryable],
        /// The platform answered with an error.
        Api { status: u16, message: String } =>
            "messenger api error (status {status}): {message}",
        /// The platform resolved the file without a downloadable path.
        MissingFilePath { file_id: String } =>
            "file {file_id} has no downloadable path",
        /// The platform response could not be decoded.
        Decode { message: String } =>
            "messenger response decode failed: {message}",
    }
}

/// Outbound messaging capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<(), MessengerError>;

    /// Acknowledge a keyboard press, optionally showing `text` to the user.
    async fn answer_callback(&self, answer: &CallbackAnswer) -> Result<(), MessengerError>;

    async fn send_invoice(&self, invoice: &Invoice) -> Result<(), MessengerError>;

    async fn answer_pre_checkout(&self, answer: &PreCheckoutAnswer)
    -> Result<(), MessengerError>;

    async fn send_photo(&self, photo: &OutgoingPhoto) -> Result<(), MessengerError>;

    /// Resolve a platform file handle and fetch its bytes.
    async fn download_file(&self, file_id: &str) -> Result<DownloadedFile, MessengerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(n: u8) -> InlineButton {
        InlineButton {
            text: n.to_string(),
            callback_data: n.to_string(),
        }
    }

    #[test]
    fn keyboard_rows_hold_two_buttons() {
        let keyboard = InlineKeyboard::in_rows((1..=5).map(button).collect(), 2);
        let lens: Vec<usize> = keyboard.rows.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![2, 2, 1]);
    }

    #[test]
    fn markdown_message_sets_parse_mode() {
        let message = OutgoingMessage::markdown(ChatId::new(1), "*hi*");
        assert_eq!(message.parse_mode, Some(ParseMode::Markdown));
        assert!(message.keyboard.is_none());
    }
}
