//! Error mapping and reply helpers shared by the bot services.

use tracing::warn;

use crate::domain::Error;
use crate::domain::ports::{
    ImageStoreError, Messenger, MessengerError, OrderRepositoryError, OutgoingMessage,
};

pub(crate) fn map_messenger_error(error: MessengerError) -> Error {
    if error.is_retryable() {
        Error::service_unavailable(format!("messenger unavailable: {error}"))
    } else {
        Error::internal(format!("messenger call failed: {error}"))
    }
}

pub(crate) fn map_order_error(error: OrderRepositoryError) -> Error {
    match error {
        OrderRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("order repository unavailable: {message}"))
        }
        OrderRepositoryError::Query { message } => {
            Error::internal(format!("order repository error: {message}"))
        }
    }
}

pub(crate) fn map_store_error(error: ImageStoreError) -> Error {
    match error {
        ImageStoreError::Io { message } => {
            Error::service_unavailable(format!("image store unavailable: {message}"))
        }
        ImageStoreError::InvalidKey { message } => {
            Error::invalid_request(format!("image key rejected: {message}"))
        }
    }
}

/// Send a best-effort reply; failures are logged and dropped.
pub(crate) async fn send_or_log(messenger: &dyn Messenger, message: OutgoingMessage) {
    let chat_id = message.chat_id;
    if let Err(error) = messenger.send_message(&message).await {
        warn!(%chat_id, error = %error, "failed to send reply");
    }
}
