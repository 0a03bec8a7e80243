//! Port for chat registry persistence.

use async_trait::async_trait;

use crate::domain::{Chat, ChatId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by chat repository adapters.
    pub enum ChatRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "chat repository connection failed: {message}" [retryable],
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "chat repository query failed: {message}",
    }
}

/// Durable storage for chats.
///
/// Rows are created once and never updated or deleted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert the chat unless a row with the same id exists.
    ///
    /// Concurrent calls for the same id must leave exactly one row; the
    /// profile of the first writer wins.
    async fn insert_if_absent(&self, chat: &Chat) -> Result<(), ChatRepositoryError>;

    /// Fetch a chat by id.
    async fn find(&self, id: ChatId) -> Result<Option<Chat>, ChatRepositoryError>;
}
