//! Invoices and the payload that correlates payments with orders.

use serde::{Deserialize, Serialize};

use super::{ChatId, OrderId};

/// Currency code for Telegram Stars.
pub const STARS_CURRENCY: &str = "XTR";

/// Failures decoding an invoice payload.
#[derive(Debug, thiserror::Error)]
pub enum InvoicePayloadError {
    #[error("invoice payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invoice payload carries a non-numeric order id: {0}")]
    OrderId(String),
}

/// Opaque payload attached to an invoice, echoed back on payment.
///
/// Serialised exactly as `{"orderId":"<id>"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoicePayload {
    pub order_id: OrderId,
}

#[derive(Serialize, Deserialize)]
struct InvoicePayloadWire {
    #[serde(rename = "orderId")]
    order_id: String,
}

impl InvoicePayload {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id }
    }

    /// Encode the payload.
    ///
    /// # Examples
    /// ```
    /// use stylebot::domain::{InvoicePayload, OrderId};
    ///
    /// assert_eq!(InvoicePayload::new(OrderId::new(5)).encode(), r#"{"orderId":"5"}"#);
    /// ```
    pub fn encode(&self) -> String {
        format!(r#"{{"orderId":"{}"}}"#, self.order_id)
    }

    pub fn parse(raw: &str) -> Result<Self, InvoicePayloadError> {
        let wire: InvoicePayloadWire = serde_json::from_str(raw)?;
        let order_id = wire
            .order_id
            .parse::<OrderId>()
            .map_err(|_| InvoicePayloadError::OrderId(wire.order_id))?;
        Ok(Self { order_id })
    }
}

/// One component of an invoice price, in the smallest currency unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledPrice {
    pub label: String,
    pub amount: u32,
}

/// Invoice sent to a chat after a style has been chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub chat_id: ChatId,
    pub title: String,
    pub description: String,
    pub payload: InvoicePayload,
    pub currency: String,
    pub prices: Vec<LabeledPrice>,
}

impl Invoice {
    /// Single-component Stars invoice.
    pub fn stars(
        chat_id: ChatId,
        title: impl Into<String>,
        description: impl Into<String>,
        payload: InvoicePayload,
        amount: u32,
    ) -> Self {
        Self {
            chat_id,
            title: title.into(),
            description: description.into(),
            payload,
            currency: STARS_CURRENCY.to_owned(),
            prices: vec![LabeledPrice {
                label: STARS_CURRENCY.to_owned(),
                amount,
            }],
        }
    }

    /// Sum of all price components.
    pub fn total(&self) -> u32 {
        self.prices.iter().map(|price| price.amount).sum()
    }
}

/// Price selection for transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub price_stars: u32,
    pub admin_price_stars: u32,
    pub admin_chat_id: Option<ChatId>,
}

impl PricingPolicy {
    /// Amount charged to `chat_id`.
    pub fn price_for(&self, chat_id: ChatId) -> u32 {
        if self.admin_chat_id == Some(chat_id) {
            self.admin_price_stars
        } else {
            self.price_stars
        }
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            price_stars: 1,
            admin_price_stars: 1,
            admin_chat_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn payload_encodes_id_as_string() {
        let payload = InvoicePayload::new(OrderId::new(1234));
        assert_eq!(payload.encode(), r#"{"orderId":"1234"}"#);
        let parsed = InvoicePayload::parse(&payload.encode()).expect("parse payload");
        assert_eq!(parsed, payload);
    }

    #[rstest]
    #[case::not_json("order 5")]
    #[case::missing_field(r#"{"id":"5"}"#)]
    #[case::numeric_field(r#"{"orderId":5}"#)]
    #[case::non_numeric(r#"{"orderId":"five"}"#)]
    fn malformed_payloads_are_rejected(#[case] raw: &str) {
        assert!(InvoicePayload::parse(raw).is_err());
    }

    #[test]
    fn stars_invoice_has_single_xtr_component() {
        let invoice = Invoice::stars(
            ChatId::new(1),
            "t",
            "d",
            InvoicePayload::new(OrderId::new(2)),
            3,
        );
        assert_eq!(invoice.currency, "XTR");
        assert_eq!(
            invoice.prices,
            vec![LabeledPrice {
                label: "XTR".into(),
                amount: 3
            }]
        );
        assert_eq!(invoice.total(), 3);
    }

    #[rstest]
    #[case(5752293796, 1)]
    #[case(42, 25)]
    fn admin_chat_gets_admin_price(#[case] chat: i64, #[case] expected: u32) {
        let policy = PricingPolicy {
            price_stars: 25,
            admin_price_stars: 1,
            admin_chat_id: Some(ChatId::new(5752293796)),
        };
        assert_eq!(policy.price_for(ChatId::new(chat)), expected);
    }
}
