//! Bot API request and response bodies.

use serde::{Deserialize, Serialize};

use crate::domain::ports::{CallbackAnswer, InlineKeyboard, OutgoingMessage, PreCheckoutAnswer};
use crate::domain::{Invoice, LabeledPrice};

/// Envelope wrapping every Bot API response.
#[derive(Debug, Deserialize)]
pub(super) struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileDto {
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct InlineKeyboardButtonDto<'a> {
    pub text: &'a str,
    pub callback_data: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct InlineKeyboardMarkupDto<'a> {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButtonDto<'a>>>,
}

impl<'a> From<&'a InlineKeyboard> for InlineKeyboardMarkupDto<'a> {
    fn from(keyboard: &'a InlineKeyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| InlineKeyboardButtonDto {
                            text: &button.text,
                            callback_data: &button.callback_data,
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkupDto<'a>>,
}

impl<'a> From<&'a OutgoingMessage> for SendMessageRequest<'a> {
    fn from(message: &'a OutgoingMessage) -> Self {
        Self {
            chat_id: message.chat_id.as_i64(),
            text: &message.text,
            parse_mode: message.parse_mode.map(|mode| mode.as_str()),
            reply_markup: message.keyboard.as_ref().map(InlineKeyboardMarkupDto::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AnswerCallbackRequest<'a> {
    pub callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
}

impl<'a> From<&'a CallbackAnswer> for AnswerCallbackRequest<'a> {
    fn from(answer: &'a CallbackAnswer) -> Self {
        Self {
            callback_query_id: &answer.callback_id,
            text: answer.text.as_deref(),
        }
    }
}

/// `sendInvoice` body. Stars invoices carry an empty provider token.
#[derive(Debug, Serialize)]
pub(super) struct SendInvoiceRequest<'a> {
    pub chat_id: i64,
    pub title: &'a str,
    pub description: &'a str,
    pub payload: String,
    pub provider_token: &'static str,
    pub currency: &'a str,
    pub prices: &'a [LabeledPrice],
}

impl<'a> From<&'a Invoice> for SendInvoiceRequest<'a> {
    fn from(invoice: &'a Invoice) -> Self {
        Self {
            chat_id: invoice.chat_id.as_i64(),
            title: &invoice.title,
            description: &invoice.description,
            payload: invoice.payload.encode(),
            provider_token: "",
            currency: &invoice.currency,
            prices: &invoice.prices,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct AnswerPreCheckoutRequest<'a> {
    pub pre_checkout_query_id: &'a str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<&'a str>,
}

impl<'a> From<&'a PreCheckoutAnswer> for AnswerPreCheckoutRequest<'a> {
    fn from(answer: &'a PreCheckoutAnswer) -> Self {
        Self {
            pre_checkout_query_id: &answer.query_id,
            ok: answer.ok,
            error_message: answer.error_message.as_deref(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct GetFileRequest<'a> {
    pub file_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::InlineButton;
    use crate::domain::{ChatId, InvoicePayload, OrderId};
    use serde_json::json;

    #[test]
    fn message_with_keyboard_serialises_reply_markup() {
        let message = OutgoingMessage::text(ChatId::new(5), "pick").with_keyboard(
            InlineKeyboard::in_rows(
                vec![InlineButton {
                    text: "Anime".into(),
                    callback_data: "anime:1".into(),
                }],
                2,
            ),
        );

        let body = serde_json::to_value(SendMessageRequest::from(&message)).expect("serialise");

        assert_eq!(
            body,
            json!({
                "chat_id": 5,
                "text": "pick",
                "reply_markup": {"inline_keyboard": [[{"text": "Anime", "callback_data": "anime:1"}]]}
            })
        );
    }

    #[test]
    fn stars_invoice_has_empty_provider_token() {
        let invoice = Invoice::stars(
            ChatId::new(5),
            "Photo stylization",
            "desc",
            InvoicePayload::new(OrderId::new(77)),
            1,
        );

        let body = serde_json::to_value(SendInvoiceRequest::from(&invoice)).expect("serialise");

        assert_eq!(body["provider_token"], "");
        assert_eq!(body["currency"], "XTR");
        assert_eq!(body["payload"], r#"{"orderId":"77"}"#);
        assert_eq!(body["prices"], json!([{"label": "XTR", "amount": 1}]));
    }

    #[test]
    fn error_envelope_decodes_without_result() {
        let response: ApiResponse<FileDto> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: wrong file_id"
        }))
        .expect("decode");
        assert!(!response.ok);
        assert!(response.result.is_none());
        assert_eq!(response.error_code, Some(400));
    }
}
