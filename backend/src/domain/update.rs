//! Transport-free representation of inbound platform updates.
//!
//! The webhook adapter decodes Telegram JSON into these types; domain
//! services never see the wire format.

use super::{ChatId, ChatProfile};

/// Chat an update originated from, with the sender's profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatContext {
    pub chat_id: ChatId,
    pub profile: ChatProfile,
}

/// One resolution of an uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

impl PhotoSize {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Pick the largest resolution by pixel area, breaking ties on byte size.
///
/// # Examples
/// ```
/// use stylebot::domain::{largest_photo, PhotoSize};
///
/// let sizes = vec![
///     PhotoSize { file_id: "s".into(), width: 90, height: 90, file_size: None },
///     PhotoSize { file_id: "l".into(), width: 1280, height: 960, file_size: None },
/// ];
/// assert_eq!(largest_photo(&sizes).map(|p| p.file_id.as_str()), Some("l"));
/// ```
pub fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
    sizes
        .iter()
        .max_by_key(|size| (size.area(), size.file_size.unwrap_or(0)))
}

/// Payment details echoed back once the user has paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub invoice_payload: String,
    pub currency: String,
    pub total_amount: u32,
    pub telegram_payment_charge_id: String,
    pub provider_payment_charge_id: Option<String>,
}

/// Checkout confirmation request the platform sends before charging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreCheckoutQuery {
    pub query_id: String,
    pub from: ChatId,
    pub currency: String,
    pub total_amount: u32,
    pub invoice_payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// A `/command` message. `name` is lowercase without the slash or
    /// `@botname` suffix.
    Command { chat: ChatContext, name: String },
    Photo { chat: ChatContext, sizes: Vec<PhotoSize> },
    StyleCallback {
        chat: ChatContext,
        callback_id: String,
        data: String,
    },
    PreCheckout(PreCheckoutQuery),
    SuccessfulPayment {
        chat: ChatContext,
        receipt: PaymentReceipt,
    },
    Unsupported { chat: Option<ChatContext> },
}

/// A single inbound update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundUpdate {
    pub update_id: i64,
    pub kind: UpdateKind,
}

impl InboundUpdate {
    pub fn new(update_id: i64, kind: UpdateKind) -> Self {
        Self { update_id, kind }
    }

    /// Originating chat, when the update has one.
    pub fn chat(&self) -> Option<&ChatContext> {
        match &self.kind {
            UpdateKind::Command { chat, .. }
            | UpdateKind::Photo { chat, .. }
            | UpdateKind::StyleCallback { chat, .. }
            | UpdateKind::SuccessfulPayment { chat, .. } => Some(chat),
            UpdateKind::PreCheckout(_) => None,
            UpdateKind::Unsupported { chat } => chat.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(file_id: &str, width: u32, height: u32, file_size: Option<u64>) -> PhotoSize {
        PhotoSize {
            file_id: file_id.into(),
            width,
            height,
            file_size,
        }
    }

    #[test]
    fn largest_photo_prefers_area() {
        let sizes = vec![
            size("m", 320, 320, Some(20_000)),
            size("l", 800, 800, Some(10_000)),
            size("s", 90, 90, Some(1_000)),
        ];
        assert_eq!(largest_photo(&sizes).map(|p| p.file_id.as_str()), Some("l"));
    }

    #[test]
    fn largest_photo_breaks_ties_on_bytes() {
        let sizes = vec![size("a", 10, 10, Some(5)), size("b", 10, 10, Some(9))];
        assert_eq!(largest_photo(&sizes).map(|p| p.file_id.as_str()), Some("b"));
    }

    #[test]
    fn largest_photo_of_nothing_is_none() {
        assert!(largest_photo(&[]).is_none());
    }

    #[test]
    fn pre_checkout_has_no_chat() {
        let update = InboundUpdate::new(
            1,
            UpdateKind::PreCheckout(PreCheckoutQuery {
                query_id: "q".into(),
                from: ChatId::new(3),
                currency: "XTR".into(),
                total_amount: 1,
                invoice_payload: r#"{"orderId":"1"}"#.into(),
            }),
        );
        assert!(update.chat().is_none());
    }
}
