//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod chat_repository;
mod image_generator;
mod image_store;
mod job_queue;
mod messenger;
mod order_repository;
mod readiness;

#[cfg(test)]
pub use chat_repository::MockChatRepository;
pub use chat_repository::{ChatRepository, ChatRepositoryError};
#[cfg(test)]
pub use image_generator::MockImageGenerator;
pub use image_generator::{
    GeneratedImage, GenerationRequest, ImageGenerator, ImageGeneratorError,
};
#[cfg(test)]
pub use image_store::MockImageStore;
pub use image_store::{ImageStore, ImageStoreError};
#[cfg(test)]
pub use job_queue::{MockJobQueue, MockJobSource};
pub use job_queue::{FulfillmentJob, JobId, JobQueue, JobQueueError, JobSource, QueuedJob};
#[cfg(test)]
pub use messenger::MockMessenger;
pub use messenger::{
    CallbackAnswer, DownloadedFile, InlineButton, InlineKeyboard, Messenger, MessengerError,
    OutgoingMessage, OutgoingPhoto, ParseMode, PreCheckoutAnswer,
};
#[cfg(test)]
pub use order_repository::MockOrderRepository;
pub use order_repository::{OrderRepository, OrderRepositoryError};
#[cfg(test)]
pub use readiness::MockReadinessCheck;
pub use readiness::ReadinessCheck;
