//! Style selection from the inline keyboard, followed by an invoice.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::messages::{self, Locale};
use crate::domain::ports::{CallbackAnswer, Messenger, OrderRepository};
use crate::domain::service_support::{map_messenger_error, map_order_error};
use crate::domain::{Chat, Error, Invoice, InvoicePayload, Order, PricingPolicy, StyleChoice};

#[derive(Clone)]
pub struct StyleSelection {
    messenger: Arc<dyn Messenger>,
    orders: Arc<dyn OrderRepository>,
    pricing: PricingPolicy,
}

impl StyleSelection {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        orders: Arc<dyn OrderRepository>,
        pricing: PricingPolicy,
    ) -> Self {
        Self {
            messenger,
            orders,
            pricing,
        }
    }

    /// Apply the chosen style and send the invoice.
    ///
    /// The style update is last-write-wins and ignores the order's status.
    pub async fn handle(&self, chat: &Chat, callback_id: &str, data: &str) -> Result<Order, Error> {
        let locale = chat.locale();
        let choice = match StyleChoice::parse(data) {
            Ok(choice) => choice,
            Err(error) => {
                self.answer(callback_id, messages::something_went_wrong(locale))
                    .await;
                return Err(Error::invalid_request(error.to_string()));
            }
        };

        let updated = match self.orders.set_style(choice.order_id, choice.style).await {
            Ok(updated) => updated,
            Err(error) => {
                self.answer(callback_id, messages::something_went_wrong(locale))
                    .await;
                return Err(map_order_error(error));
            }
        };
        let Some(order) = updated else {
            self.answer(callback_id, messages::order_not_found(locale))
                .await;
            return Err(Error::not_found(format!("order {} not found", choice.order_id)));
        };

        info!(order_id = %order.id, style = %choice.style, "style selected");
        self.acknowledge(callback_id).await;

        let invoice = self.invoice_for(chat, &order, locale);
        self.messenger
            .send_invoice(&invoice)
            .await
            .map_err(map_messenger_error)?;
        Ok(order)
    }

    fn invoice_for(&self, chat: &Chat, order: &Order, locale: Locale) -> Invoice {
        Invoice::stars(
            chat.id,
            messages::invoice_title(locale),
            messages::invoice_description(locale),
            InvoicePayload::new(order.id),
            self.pricing.price_for(chat.id),
        )
    }

    async fn answer(&self, callback_id: &str, text: &str) {
        self.answer_callback(CallbackAnswer {
            callback_id: callback_id.to_owned(),
            text: Some(text.to_owned()),
        })
        .await;
    }

    async fn acknowledge(&self, callback_id: &str) {
        self.answer_callback(CallbackAnswer {
            callback_id: callback_id.to_owned(),
            text: None,
        })
        .await;
    }

    async fn answer_callback(&self, answer: CallbackAnswer) {
        if let Err(error) = self.messenger.answer_callback(&answer).await {
            warn!(callback_id = %answer.callback_id, error = %error, "failed to answer callback");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockMessenger, MockOrderRepository};
    use crate::domain::{ChatId, ChatProfile, ErrorCode, ObjectKey, OrderId, Style};
    use chrono::DateTime;
    use mockall::predicate::eq;
    use rstest::rstest;

    const ADMIN: i64 = 5752293796;

    fn chat(id: i64) -> Chat {
        Chat::new(ChatId::new(id), ChatProfile::default())
    }

    fn pricing() -> PricingPolicy {
        PricingPolicy {
            price_stars: 50,
            admin_price_stars: 1,
            admin_chat_id: Some(ChatId::new(ADMIN)),
        }
    }

    fn styled(id: i64, chat: i64, style: Style) -> Order {
        let mut order = Order::pending(
            OrderId::new(id),
            ChatId::new(chat),
            ObjectKey::new(format!("{chat}/in.jpg")).expect("valid key"),
            DateTime::UNIX_EPOCH,
        );
        order.style = Some(style);
        order
    }

    #[rstest]
    #[case::customer(42, 50)]
    #[case::admin(ADMIN, 1)]
    #[tokio::test]
    async fn selection_answers_callback_then_sends_invoice(
        #[case] chat_id: i64,
        #[case] amount: u32,
    ) {
        let mut orders = MockOrderRepository::new();
        orders
            .expect_set_style()
            .with(eq(OrderId::new(7)), eq(Style::Ghibli))
            .times(1)
            .returning(move |id, style| Ok(Some(styled(id.as_i64(), chat_id, style))));

        let mut messenger = MockMessenger::new();
        let mut seq = mockall::Sequence::new();
        messenger
            .expect_answer_callback()
            .withf(|answer| answer.callback_id == "cb-1" && answer.text.is_none())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        messenger
            .expect_send_invoice()
            .withf(move |invoice| {
                invoice.title == "One-time payment"
                    && invoice.description == "One-time payment for the photo transformation"
                    && invoice.payload.encode() == r#"{"orderId":"7"}"#
                    && invoice.currency == "XTR"
                    && invoice.prices.len() == 1
                    && invoice.prices[0].label == "XTR"
                    && invoice.prices[0].amount == amount
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let service = StyleSelection::new(Arc::new(messenger), Arc::new(orders), pricing());
        let order = service
            .handle(&chat(chat_id), "cb-1", "ghibli:7")
            .await
            .expect("selection");
        assert_eq!(order.style, Some(Style::Ghibli));
    }

    #[tokio::test]
    async fn missing_order_answers_not_found_without_invoice() {
        let mut orders = MockOrderRepository::new();
        orders.expect_set_style().returning(|_, _| Ok(None));
        let mut messenger = MockMessenger::new();
        messenger
            .expect_answer_callback()
            .withf(|answer| answer.text.as_deref() == Some("Order not found"))
            .times(1)
            .returning(|_| Ok(()));
        messenger.expect_send_invoice().never();

        let service = StyleSelection::new(Arc::new(messenger), Arc::new(orders), pricing());
        let err = service
            .handle(&chat(42), "cb", "anime:404")
            .await
            .expect_err("missing order");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[case("watercolor:7")]
    #[case("pixar:seven")]
    #[case("garbage")]
    #[tokio::test]
    async fn malformed_data_answers_something_went_wrong(#[case] data: &str) {
        let mut orders = MockOrderRepository::new();
        orders.expect_set_style().never();
        let mut messenger = MockMessenger::new();
        messenger
            .expect_answer_callback()
            .withf(|answer| {
                answer.text.as_deref() == Some("Something went wrong. Please, try again later")
            })
            .times(1)
            .returning(|_| Ok(()));
        messenger.expect_send_invoice().never();

        let service = StyleSelection::new(Arc::new(messenger), Arc::new(orders), pricing());
        let err = service
            .handle(&chat(42), "cb", data)
            .await
            .expect_err("malformed");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }
}
