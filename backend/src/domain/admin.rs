//! Notifications to the operator's chat.

use std::sync::Arc;

use tracing::warn;

use crate::domain::ChatId;
use crate::domain::ports::{Messenger, OutgoingMessage};

/// Sends operator notices when an admin chat is configured.
///
/// Delivery failures are logged and never propagate.
#[derive(Clone)]
pub struct AdminNotifier {
    messenger: Arc<dyn Messenger>,
    admin_chat_id: Option<ChatId>,
}

impl AdminNotifier {
    pub fn new(messenger: Arc<dyn Messenger>, admin_chat_id: Option<ChatId>) -> Self {
        Self {
            messenger,
            admin_chat_id,
        }
    }

    /// Notifier that drops every notice.
    pub fn disabled(messenger: Arc<dyn Messenger>) -> Self {
        Self::new(messenger, None)
    }

    pub fn admin_chat_id(&self) -> Option<ChatId> {
        self.admin_chat_id
    }

    pub async fn notify(&self, text: String) {
        let Some(chat_id) = self.admin_chat_id else {
            return;
        };
        let message = OutgoingMessage::text(chat_id, text);
        if let Err(error) = self.messenger.send_message(&message).await {
            warn!(admin_chat_id = %chat_id, error = %error, "failed to notify admin chat");
        }
    }
}
