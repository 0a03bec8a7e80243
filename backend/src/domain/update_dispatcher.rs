//! Routes inbound updates to the bot services.

use std::sync::Arc;

use tracing::{debug, error};

use crate::domain::admin::AdminNotifier;
use crate::domain::chat_registry::ChatRegistry;
use crate::domain::messages;
use crate::domain::order_intake::OrderIntake;
use crate::domain::payment::PaymentService;
use crate::domain::ports::{
    ChatRepository, ImageStore, JobQueue, Messenger, OrderRepository, OutgoingMessage,
};
use crate::domain::service_support::map_messenger_error;
use crate::domain::style_selection::StyleSelection;
use crate::domain::{Chat, Error, InboundUpdate, PricingPolicy, UpdateKind};

/// Driven ports needed to handle updates.
#[derive(Clone)]
pub struct BotPorts {
    pub messenger: Arc<dyn Messenger>,
    pub chats: Arc<dyn ChatRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub store: Arc<dyn ImageStore>,
    pub queue: Arc<dyn JobQueue>,
}

/// Entry point for every update the platform delivers.
#[derive(Clone)]
pub struct UpdateDispatcher {
    messenger: Arc<dyn Messenger>,
    registry: ChatRegistry,
    intake: OrderIntake,
    selection: StyleSelection,
    payment: PaymentService,
}

impl UpdateDispatcher {
    pub fn new(ports: BotPorts, pricing: PricingPolicy) -> Self {
        let admin = AdminNotifier::new(Arc::clone(&ports.messenger), pricing.admin_chat_id);
        Self {
            registry: ChatRegistry::new(Arc::clone(&ports.chats)),
            intake: OrderIntake::new(
                Arc::clone(&ports.messenger),
                Arc::clone(&ports.store),
                Arc::clone(&ports.orders),
            ),
            selection: StyleSelection::new(
                Arc::clone(&ports.messenger),
                Arc::clone(&ports.orders),
                pricing,
            ),
            payment: PaymentService::new(
                Arc::clone(&ports.messenger),
                ports.orders,
                ports.queue,
                admin,
            ),
            messenger: ports.messenger,
        }
    }

    /// Handle one update.
    ///
    /// Pre-checkout queries are answered without touching the chat registry.
    /// Every other update with a chat registers it first; when registration
    /// fails the update is dropped without a reply.
    pub async fn dispatch(&self, update: InboundUpdate) -> Result<(), Error> {
        let update_id = update.update_id;
        if let UpdateKind::PreCheckout(query) = &update.kind {
            self.payment.pre_checkout(query).await;
            return Ok(());
        }

        let Some(context) = update.chat() else {
            debug!(update_id, "ignoring update without a chat");
            return Ok(());
        };
        let chat = match self.registry.ensure(context).await {
            Ok(chat) => chat,
            Err(err) => {
                error!(update_id, chat_id = %context.chat_id, error = %err, "chat registration failed; dropping update");
                return Err(err);
            }
        };

        match &update.kind {
            UpdateKind::Command { name, .. } => self.command(&chat, name).await,
            UpdateKind::Photo { sizes, .. } => self.intake.handle(&chat, sizes).await.map(drop),
            UpdateKind::StyleCallback {
                callback_id, data, ..
            } => self
                .selection
                .handle(&chat, callback_id, data)
                .await
                .map(drop),
            UpdateKind::SuccessfulPayment { receipt, .. } => {
                self.payment.confirm(&chat, receipt).await.map(drop)
            }
            UpdateKind::PreCheckout(_) | UpdateKind::Unsupported { .. } => {
                debug!(update_id, chat_id = %chat.id, "ignoring unsupported update");
                Ok(())
            }
        }
    }

    async fn command(&self, chat: &Chat, name: &str) -> Result<(), Error> {
        match name {
            "start" | "help" => self
                .messenger
                .send_message(&OutgoingMessage::markdown(
                    chat.id,
                    messages::hello(chat.locale()),
                ))
                .await
                .map_err(map_messenger_error),
            other => {
                debug!(chat_id = %chat.id, command = other, "ignoring unknown command");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{ChatRepositoryError, MockChatRepository};
    use crate::domain::{
        ChatContext, ChatId, ChatProfile, Locale, PaymentReceipt, PhotoSize, PreCheckoutQuery,
    };
    use crate::test_support::{
        InMemoryChatRepository, InMemoryImageStore, InMemoryJobQueue, InMemoryOrderRepository,
        RecordingMessenger,
    };
    use rstest::rstest;

    struct Fixture {
        messenger: Arc<RecordingMessenger>,
        chats: Arc<InMemoryChatRepository>,
        orders: Arc<InMemoryOrderRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                messenger: Arc::new(
                    RecordingMessenger::default().with_file("big", "file_1.jpg", vec![7; 4]),
                ),
                chats: Arc::new(InMemoryChatRepository::default()),
                orders: Arc::new(InMemoryOrderRepository::default()),
            }
        }

        fn dispatcher_with(&self, chats: Arc<dyn ChatRepository>) -> UpdateDispatcher {
            UpdateDispatcher::new(
                BotPorts {
                    messenger: self.messenger.clone(),
                    chats,
                    orders: self.orders.clone(),
                    store: Arc::new(InMemoryImageStore::default()),
                    queue: Arc::new(InMemoryJobQueue::default()),
                },
                PricingPolicy::default(),
            )
        }

        fn dispatcher(&self) -> UpdateDispatcher {
            self.dispatcher_with(self.chats.clone())
        }
    }

    fn context(language: Option<&str>) -> ChatContext {
        ChatContext {
            chat_id: ChatId::new(100),
            profile: ChatProfile {
                first_name: Some("Grace".into()),
                language_code: language.map(str::to_owned),
                ..ChatProfile::default()
            },
        }
    }

    fn command(name: &str, language: Option<&str>) -> InboundUpdate {
        InboundUpdate::new(
            1,
            UpdateKind::Command {
                chat: context(language),
                name: name.to_owned(),
            },
        )
    }

    #[rstest]
    #[case("start", None, Locale::En)]
    #[case("help", Some("ru"), Locale::Ru)]
    #[tokio::test]
    async fn start_and_help_send_localized_hello(
        #[case] name: &str,
        #[case] language: Option<&str>,
        #[case] locale: Locale,
    ) {
        let fixture = Fixture::new();
        fixture
            .dispatcher()
            .dispatch(command(name, language))
            .await
            .expect("dispatch");

        let sent = fixture.messenger.messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, messages::hello(locale));
        assert!(sent[0].parse_mode.is_some());
        assert_eq!(fixture.chats.len(), 1);
    }

    #[tokio::test]
    async fn unknown_commands_are_ignored_after_registration() {
        let fixture = Fixture::new();
        fixture
            .dispatcher()
            .dispatch(command("settings", None))
            .await
            .expect("dispatch");
        assert!(fixture.messenger.messages().is_empty());
        assert_eq!(fixture.chats.len(), 1);
    }

    #[tokio::test]
    async fn photos_create_orders() {
        let fixture = Fixture::new();
        let update = InboundUpdate::new(
            2,
            UpdateKind::Photo {
                chat: context(None),
                sizes: vec![PhotoSize {
                    file_id: "big".into(),
                    width: 800,
                    height: 600,
                    file_size: None,
                }],
            },
        );
        fixture.dispatcher().dispatch(update).await.expect("dispatch");
        assert_eq!(fixture.orders.all().len(), 1);
    }

    #[tokio::test]
    async fn pre_checkout_bypasses_registry() {
        let fixture = Fixture::new();
        let mut chats = MockChatRepository::new();
        chats.expect_find().never();
        chats.expect_insert_if_absent().never();
        let update = InboundUpdate::new(
            3,
            UpdateKind::PreCheckout(PreCheckoutQuery {
                query_id: "q-1".into(),
                from: ChatId::new(100),
                currency: "XTR".into(),
                total_amount: 1,
                invoice_payload: r#"{"orderId":"1"}"#.into(),
            }),
        );

        fixture
            .dispatcher_with(Arc::new(chats))
            .dispatch(update)
            .await
            .expect("dispatch");
        let answers = fixture.messenger.pre_checkout_answers();
        assert_eq!(answers.len(), 1);
        assert!(answers[0].ok);
    }

    #[tokio::test]
    async fn registry_failure_drops_update_silently() {
        let fixture = Fixture::new();
        let mut chats = MockChatRepository::new();
        chats
            .expect_find()
            .returning(|_| Err(ChatRepositoryError::connection("database down")));
        let update = InboundUpdate::new(
            4,
            UpdateKind::SuccessfulPayment {
                chat: context(None),
                receipt: PaymentReceipt {
                    invoice_payload: r#"{"orderId":"1"}"#.into(),
                    currency: "XTR".into(),
                    total_amount: 1,
                    telegram_payment_charge_id: "c".into(),
                    provider_payment_charge_id: None,
                },
            },
        );

        let result = fixture.dispatcher_with(Arc::new(chats)).dispatch(update).await;
        assert!(result.is_err());
        assert!(fixture.messenger.messages().is_empty());
    }

    #[tokio::test]
    async fn unsupported_updates_without_chat_are_ignored() {
        let fixture = Fixture::new();
        fixture
            .dispatcher()
            .dispatch(InboundUpdate::new(5, UpdateKind::Unsupported { chat: None }))
            .await
            .expect("dispatch");
        assert!(fixture.chats.is_empty());
    }
}
