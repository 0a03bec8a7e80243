//! Telegram `Update` wire types and their mapping onto domain updates.
//!
//! Only the fields the bot reads are declared; everything else in the
//! payload is ignored by serde.

use serde::Deserialize;

use crate::domain::{
    ChatContext, ChatId, ChatProfile, InboundUpdate, PaymentReceipt, PhotoSize, PreCheckoutQuery,
    UpdateKind,
};

#[derive(Debug, Deserialize)]
pub struct UpdateDto {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<MessageDto>,
    #[serde(default)]
    pub callback_query: Option<CallbackQueryDto>,
    #[serde(default)]
    pub pre_checkout_query: Option<PreCheckoutQueryDto>,
}

#[derive(Debug, Deserialize)]
pub struct UserDto {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatDto {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PhotoSizeDto {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct SuccessfulPaymentDto {
    pub currency: String,
    pub total_amount: u32,
    pub invoice_payload: String,
    pub telegram_payment_charge_id: String,
    #[serde(default)]
    pub provider_payment_charge_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessageDto {
    pub chat: ChatDto,
    #[serde(default)]
    pub from: Option<UserDto>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSizeDto>>,
    #[serde(default)]
    pub successful_payment: Option<SuccessfulPaymentDto>,
}

/// The message a callback button was attached to.
#[derive(Debug, Deserialize)]
pub struct CallbackMessageDto {
    pub chat: ChatDto,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQueryDto {
    pub id: String,
    pub from: UserDto,
    #[serde(default)]
    pub message: Option<CallbackMessageDto>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PreCheckoutQueryDto {
    pub id: String,
    pub from: UserDto,
    pub currency: String,
    pub total_amount: u32,
    pub invoice_payload: String,
}

fn context(chat: &ChatDto, from: Option<&UserDto>) -> ChatContext {
    let pick = |own: &Option<String>, sender: Option<&Option<String>>| {
        own.clone().or_else(|| sender.and_then(Clone::clone))
    };
    ChatContext {
        chat_id: ChatId::new(chat.id),
        profile: ChatProfile {
            username: pick(&chat.username, from.map(|user| &user.username)),
            first_name: pick(&chat.first_name, from.map(|user| &user.first_name)),
            last_name: pick(&chat.last_name, from.map(|user| &user.last_name)),
            language_code: from.and_then(|user| user.language_code.clone()),
            chat_type: chat.kind.clone(),
        },
    }
}

fn sender_context(user: &UserDto) -> ChatContext {
    ChatContext {
        chat_id: ChatId::new(user.id),
        profile: ChatProfile {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            language_code: user.language_code.clone(),
            chat_type: Some("private".to_owned()),
        },
    }
}

/// Extract a bot command name from message text.
///
/// Returns the lowercased first token without its leading slash or
/// `@botname` suffix.
///
/// # Examples
/// ```
/// use stylebot::inbound::http::dto::command_name;
///
/// assert_eq!(command_name("/Start@StyleBot now").as_deref(), Some("start"));
/// assert_eq!(command_name("hello"), None);
/// ```
pub fn command_name(text: &str) -> Option<String> {
    let token = text.split_whitespace().next()?.strip_prefix('/')?;
    let name = token.split('@').next().unwrap_or(token);
    if name.is_empty() {
        return None;
    }
    Some(name.to_lowercase())
}

impl MessageDto {
    fn into_kind(self) -> UpdateKind {
        let chat = context(&self.chat, self.from.as_ref());
        if let Some(payment) = self.successful_payment {
            return UpdateKind::SuccessfulPayment {
                chat,
                receipt: PaymentReceipt {
                    invoice_payload: payment.invoice_payload,
                    currency: payment.currency,
                    total_amount: payment.total_amount,
                    telegram_payment_charge_id: payment.telegram_payment_charge_id,
                    provider_payment_charge_id: payment.provider_payment_charge_id,
                },
            };
        }
        if let Some(photo) = self.photo.filter(|sizes| !sizes.is_empty()) {
            return UpdateKind::Photo {
                chat,
                sizes: photo
                    .into_iter()
                    .map(|size| PhotoSize {
                        file_id: size.file_id,
                        width: size.width,
                        height: size.height,
                        file_size: size.file_size,
                    })
                    .collect(),
            };
        }
        match self.text.as_deref().and_then(command_name) {
            Some(name) => UpdateKind::Command { chat, name },
            None => UpdateKind::Unsupported { chat: Some(chat) },
        }
    }
}

impl CallbackQueryDto {
    fn into_kind(self) -> UpdateKind {
        let chat = match &self.message {
            Some(message) => context(&message.chat, Some(&self.from)),
            None => sender_context(&self.from),
        };
        match self.data {
            Some(data) => UpdateKind::StyleCallback {
                chat,
                callback_id: self.id,
                data,
            },
            None => UpdateKind::Unsupported { chat: Some(chat) },
        }
    }
}

impl From<PreCheckoutQueryDto> for PreCheckoutQuery {
    fn from(query: PreCheckoutQueryDto) -> Self {
        Self {
            query_id: query.id,
            from: ChatId::new(query.from.id),
            currency: query.currency,
            total_amount: query.total_amount,
            invoice_payload: query.invoice_payload,
        }
    }
}

impl From<UpdateDto> for InboundUpdate {
    fn from(update: UpdateDto) -> Self {
        let kind = if let Some(query) = update.pre_checkout_query {
            UpdateKind::PreCheckout(query.into())
        } else if let Some(callback) = update.callback_query {
            callback.into_kind()
        } else if let Some(message) = update.message {
            message.into_kind()
        } else {
            UpdateKind::Unsupported { chat: None }
        };
        InboundUpdate::new(update.update_id, kind)
    }
}
