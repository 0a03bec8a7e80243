//! Pre-checkout validation and payment confirmation.
//!
//! The invoice payload is the only link between a payment and its order.
//! Confirmation moves a `pending` or `processing` order to `processing` and
//! hands it to the fulfillment queue. Orders that have already been
//! fulfilled or failed are left alone and reported to the admin chat.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::domain::admin::AdminNotifier;
use crate::domain::messages::{self, Locale};
use crate::domain::ports::{
    FulfillmentJob, JobQueue, JobQueueError, Messenger, OrderRepository, OutgoingMessage,
    PreCheckoutAnswer,
};
use crate::domain::service_support::{map_messenger_error, map_order_error, send_or_log};
use crate::domain::{Chat, Error, InvoicePayload, Order, PaymentReceipt, PreCheckoutQuery};

/// Error text shown by the platform when checkout is refused.
const INVALID_PAYLOAD_MESSAGE: &str = "This invoice is no longer valid";

#[derive(Clone)]
pub struct PaymentService {
    messenger: Arc<dyn Messenger>,
    orders: Arc<dyn OrderRepository>,
    queue: Arc<dyn JobQueue>,
    admin: AdminNotifier,
}

impl PaymentService {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        orders: Arc<dyn OrderRepository>,
        queue: Arc<dyn JobQueue>,
        admin: AdminNotifier,
    ) -> Self {
        Self {
            messenger,
            orders,
            queue,
            admin,
        }
    }

    fn map_queue_error(error: JobQueueError) -> Error {
        if error.is_retryable() {
            Error::service_unavailable(format!("fulfillment queue unavailable: {error}"))
        } else {
            Error::internal(format!("fulfillment queue error: {error}"))
        }
    }

    /// Accept checkout when the payload names an order.
    ///
    /// Answer failures are logged and not retried.
    pub async fn pre_checkout(&self, query: &PreCheckoutQuery) {
        let answer = match InvoicePayload::parse(&query.invoice_payload) {
            Ok(payload) => {
                info!(order_id = %payload.order_id, from = %query.from, "accepting checkout");
                PreCheckoutAnswer::accept(&query.query_id)
            }
            Err(error) => {
                warn!(from = %query.from, error = %error, "rejecting checkout");
                PreCheckoutAnswer::reject(&query.query_id, INVALID_PAYLOAD_MESSAGE)
            }
        };
        if let Err(error) = self.messenger.answer_pre_checkout(&answer).await {
            error!(query_id = %query.query_id, error = %error, "failed to answer pre-checkout query");
        }
    }

    /// Confirm a completed payment and queue the order for fulfillment.
    pub async fn confirm(&self, chat: &Chat, receipt: &PaymentReceipt) -> Result<Order, Error> {
        let locale = chat.locale();
        let payload = match InvoicePayload::parse(&receipt.invoice_payload) {
            Ok(payload) => payload,
            Err(error) => {
                self.reply(chat, messages::something_went_wrong(locale))
                    .await;
                return Err(Error::invalid_request(error.to_string()));
            }
        };

        let paid = match self
            .orders
            .mark_paid(
                payload.order_id,
                Some(receipt.telegram_payment_charge_id.clone()),
            )
            .await
        {
            Ok(paid) => paid,
            Err(error) => {
                self.reply(chat, messages::try_later(locale)).await;
                return Err(map_order_error(error));
            }
        };
        let Some(order) = paid else {
            return Err(self.reject_unpayable(chat, payload, receipt, locale).await);
        };

        if let Err(error) = self.queue.enqueue(&FulfillmentJob::new(order.clone())).await {
            error!(order_id = %order.id, error = %error, "failed to enqueue fulfillment job");
            self.reply(chat, messages::try_later(locale)).await;
            return Err(Self::map_queue_error(error));
        }
        info!(order_id = %order.id, chat_id = %chat.id, "payment confirmed; order queued");

        self.admin.notify(messages::admin_order_paid(&order)).await;
        self.send_processing(chat, &order, locale).await?;
        Ok(order)
    }

    /// Report a payment that matched no payable order.
    async fn reject_unpayable(
        &self,
        chat: &Chat,
        payload: InvoicePayload,
        receipt: &PaymentReceipt,
        locale: Locale,
    ) -> Error {
        match self.orders.find(payload.order_id).await {
            Ok(Some(order)) => {
                warn!(
                    order_id = %order.id,
                    status = %order.status,
                    charge_id = %receipt.telegram_payment_charge_id,
                    "payment received for an already settled order"
                );
                self.admin
                    .notify(messages::admin_order_already_settled(
                        &order,
                        &receipt.telegram_payment_charge_id,
                    ))
                    .await;
                self.reply(chat, messages::something_went_wrong(locale))
                    .await;
                Error::conflict(format!("order {} is already {}", order.id, order.status))
            }
            Ok(None) => {
                self.reply(chat, messages::order_not_found(locale)).await;
                Error::not_found(format!("order {} not found", payload.order_id))
            }
            Err(error) => {
                self.reply(chat, messages::try_later(locale)).await;
                map_order_error(error)
            }
        }
    }

    async fn send_processing(&self, chat: &Chat, order: &Order, locale: Locale) -> Result<(), Error> {
        let Some(style) = order.style else {
            warn!(order_id = %order.id, "paid order has no style");
            return Ok(());
        };
        self.messenger
            .send_message(&OutgoingMessage::markdown(
                chat.id,
                messages::processing(locale, style),
            ))
            .await
            .map_err(map_messenger_error)
    }

    async fn reply(&self, chat: &Chat, text: &str) {
        send_or_log(self.messenger.as_ref(), OutgoingMessage::text(chat.id, text)).await;
    }
}

#[cfg(test)]
#[path = "payment_tests.rs"]
mod tests;
