//! Turns an uploaded photo into a pending order.
//!
//! Every photo creates a new order; identical uploads are not deduplicated.

use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::messages::{self, Locale};
use crate::domain::ports::{
    ImageStore, InlineButton, InlineKeyboard, Messenger, OrderRepository, OutgoingMessage,
};
use crate::domain::service_support::{
    map_messenger_error, map_order_error, map_store_error, send_or_log,
};
use crate::domain::{
    Chat, Error, NewOrder, ObjectKey, Order, PhotoSize, Style, StyleChoice, largest_photo,
};

/// Buttons per keyboard row.
const STYLES_PER_ROW: usize = 2;

/// Style keyboard for `order`, one button per style.
pub fn style_keyboard(order: &Order) -> InlineKeyboard {
    let buttons = Style::ALL
        .into_iter()
        .map(|style| InlineButton {
            text: style.label().to_owned(),
            callback_data: StyleChoice::new(style, order.id).encode(),
        })
        .collect();
    InlineKeyboard::in_rows(buttons, STYLES_PER_ROW)
}

#[derive(Clone)]
pub struct OrderIntake {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn ImageStore>,
    orders: Arc<dyn OrderRepository>,
}

impl OrderIntake {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn ImageStore>,
        orders: Arc<dyn OrderRepository>,
    ) -> Self {
        Self {
            messenger,
            store,
            orders,
        }
    }

    /// Create an order from a photo message and offer the style keyboard.
    ///
    /// On any failure before the order exists the user is asked to retry and
    /// the error is returned for logging.
    pub async fn handle(&self, chat: &Chat, sizes: &[PhotoSize]) -> Result<Order, Error> {
        let locale = chat.locale();
        match self.create_order(chat, sizes).await {
            Ok(order) => {
                info!(order_id = %order.id, chat_id = %chat.id, "created order");
                let prompt = OutgoingMessage::text(chat.id, messages::choose_style(locale))
                    .with_keyboard(style_keyboard(&order));
                self.messenger
                    .send_message(&prompt)
                    .await
                    .map_err(map_messenger_error)?;
                Ok(order)
            }
            Err(error) => {
                warn!(chat_id = %chat.id, error = %error, "failed to receive photo");
                self.reply_retry(chat, locale).await;
                Err(error)
            }
        }
    }

    async fn create_order(&self, chat: &Chat, sizes: &[PhotoSize]) -> Result<Order, Error> {
        let photo = largest_photo(sizes)
            .ok_or_else(|| Error::invalid_request("photo message carries no sizes"))?;
        let file = self
            .messenger
            .download_file(&photo.file_id)
            .await
            .map_err(map_messenger_error)?;
        let key = ObjectKey::input(chat.id, &file.file_name)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        self.store
            .put(&key, file.bytes)
            .await
            .map_err(map_store_error)?;
        self.orders
            .create(NewOrder {
                chat_id: chat.id,
                input_image_path: key,
            })
            .await
            .map_err(map_order_error)
    }

    async fn reply_retry(&self, chat: &Chat, locale: Locale) {
        send_or_log(
            self.messenger.as_ref(),
            OutgoingMessage::text(chat.id, messages::photo_not_received(locale)),
        )
        .await;
    }
}
