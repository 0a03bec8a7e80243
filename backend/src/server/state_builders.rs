//! Builders wiring outbound adapters into the domain services.

use std::io;
use std::sync::Arc;

use mockable::DefaultClock;
use stylebot::domain::ports::{ChatRepository, ImageStore, Messenger, OrderRepository};
use stylebot::domain::{
    AdminNotifier, BotPorts, FulfillmentWorker, FulfillmentWorkerConfig, FulfillmentWorkerPorts,
    UpdateDispatcher,
};
use stylebot::inbound::http::HttpState;
use stylebot::inbound::worker::QueueConsumer;
use stylebot::outbound::openai::{OpenAiHttpGenerator, OpenAiIdentity};
use stylebot::outbound::persistence::{
    DbPool, DieselChatRepository, DieselJobQueue, DieselOrderRepository,
};
use stylebot::outbound::storage::CapStdImageStore;
use stylebot::outbound::telegram::TelegramHttpMessenger;
use stylebot::settings::BotConfig;

/// Inbound entry points sharing one set of adapters.
pub struct Services {
    pub http_state: HttpState,
    pub consumer: QueueConsumer,
}

/// Build every adapter and the services that drive them.
///
/// # Errors
///
/// Returns [`io::Error`] when an HTTP client or the storage root cannot be
/// initialised.
pub fn build_services(config: &BotConfig, pool: DbPool) -> io::Result<Services> {
    let messenger: Arc<dyn Messenger> = Arc::new(
        TelegramHttpMessenger::new(
            config.telegram_api_base.clone(),
            config.bot_token.clone(),
            config.http_timeout,
        )
        .map_err(io::Error::other)?,
    );
    let generator = Arc::new(
        OpenAiHttpGenerator::new(
            &config.openai_api_base,
            OpenAiIdentity::new(config.openai_api_key.clone())
                .with_model(config.image_model.clone()),
            config.http_timeout,
        )
        .map_err(io::Error::other)?,
    );
    let store: Arc<dyn ImageStore> =
        Arc::new(CapStdImageStore::open(&config.storage_root).map_err(io::Error::other)?);
    let chats: Arc<dyn ChatRepository> = Arc::new(DieselChatRepository::new(pool.clone()));
    let orders: Arc<dyn OrderRepository> = Arc::new(DieselOrderRepository::new(pool.clone()));
    let queue = Arc::new(DieselJobQueue::new(pool));

    let dispatcher = UpdateDispatcher::new(
        BotPorts {
            messenger: Arc::clone(&messenger),
            chats: Arc::clone(&chats),
            orders: Arc::clone(&orders),
            store: Arc::clone(&store),
            queue: queue.clone(),
        },
        config.pricing,
    );
    let worker = FulfillmentWorker::new(
        FulfillmentWorkerPorts {
            orders,
            chats,
            store,
            generator,
            messenger: Arc::clone(&messenger),
        },
        AdminNotifier::new(messenger, config.pricing.admin_chat_id),
        Arc::new(DefaultClock),
        FulfillmentWorkerConfig::default(),
    );

    Ok(Services {
        http_state: HttpState::new(Arc::new(dispatcher))
            .with_webhook_secret(config.webhook_secret.clone()),
        consumer: QueueConsumer::new(queue, Arc::new(worker), config.consumer),
    })
}
