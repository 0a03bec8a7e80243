//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only
//! depend on the update dispatcher and remain testable without I/O.

use std::sync::Arc;

use zeroize::Zeroizing;

use crate::domain::UpdateDispatcher;

/// Dependency bundle for the webhook handler.
#[derive(Clone)]
pub struct HttpState {
    pub dispatcher: Arc<UpdateDispatcher>,
    webhook_secret: Option<Arc<Zeroizing<String>>>,
}

impl HttpState {
    pub fn new(dispatcher: Arc<UpdateDispatcher>) -> Self {
        Self {
            dispatcher,
            webhook_secret: None,
        }
    }

    /// Require `X-Telegram-Bot-Api-Secret-Token` to equal `secret`.
    ///
    /// Blank secrets leave the webhook open.
    pub fn with_webhook_secret(mut self, secret: Option<Zeroizing<String>>) -> Self {
        self.webhook_secret = secret
            .filter(|value| !value.trim().is_empty())
            .map(Arc::new);
        self
    }

    /// Whether a request presenting `presented` may reach the dispatcher.
    pub fn accepts_secret(&self, presented: Option<&str>) -> bool {
        match &self.webhook_secret {
            None => true,
            Some(expected) => presented == Some(expected.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BotPorts, PricingPolicy};
    use crate::test_support::{
        InMemoryChatRepository, InMemoryImageStore, InMemoryJobQueue, InMemoryOrderRepository,
        RecordingMessenger,
    };
    use rstest::rstest;

    fn dispatcher() -> Arc<UpdateDispatcher> {
        Arc::new(UpdateDispatcher::new(
            BotPorts {
                messenger: Arc::new(RecordingMessenger::default()),
                chats: Arc::new(InMemoryChatRepository::default()),
                orders: Arc::new(InMemoryOrderRepository::default()),
                store: Arc::new(InMemoryImageStore::default()),
                queue: Arc::new(InMemoryJobQueue::default()),
            },
            PricingPolicy::default(),
        ))
    }

    #[rstest]
    #[case(None, None, true)]
    #[case(None, Some("anything"), true)]
    #[case(Some("  "), None, true)]
    #[case(Some("s3cret"), Some("s3cret"), true)]
    #[case(Some("s3cret"), Some("wrong"), false)]
    #[case(Some("s3cret"), None, false)]
    fn secret_check(
        #[case] configured: Option<&str>,
        #[case] presented: Option<&str>,
        #[case] accepted: bool,
    ) {
        let state = HttpState::new(dispatcher())
            .with_webhook_secret(configured.map(|value| Zeroizing::new(value.to_owned())));
        assert_eq!(state.accepts_secret(presented), accepted);
    }
}
