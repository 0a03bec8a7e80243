//! Lazily registers chats on first contact.

use std::sync::Arc;

use tracing::debug;

use crate::domain::ports::{ChatRepository, ChatRepositoryError};
use crate::domain::{Chat, ChatContext, Error};

/// Ensures every chat that talks to the bot has a stored row.
#[derive(Clone)]
pub struct ChatRegistry {
    chats: Arc<dyn ChatRepository>,
}

impl ChatRegistry {
    pub fn new(chats: Arc<dyn ChatRepository>) -> Self {
        Self { chats }
    }

    fn map_repository_error(error: ChatRepositoryError) -> Error {
        match error {
            ChatRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("chat repository unavailable: {message}"))
            }
            ChatRepositoryError::Query { message } => {
                Error::internal(format!("chat repository error: {message}"))
            }
        }
    }

    /// Return the stored chat, inserting it first if it is new.
    ///
    /// The stored profile is never refreshed; a chat that changes its
    /// username keeps the one captured at first contact.
    pub async fn ensure(&self, context: &ChatContext) -> Result<Chat, Error> {
        if let Some(chat) = self
            .chats
            .find(context.chat_id)
            .await
            .map_err(Self::map_repository_error)?
        {
            return Ok(chat);
        }

        let candidate = Chat::new(context.chat_id, context.profile.clone());
        self.chats
            .insert_if_absent(&candidate)
            .await
            .map_err(Self::map_repository_error)?;
        debug!(chat_id = %context.chat_id, "registered chat");

        self.chats
            .find(context.chat_id)
            .await
            .map_err(Self::map_repository_error)?
            .ok_or_else(|| {
                Error::internal(format!("chat {} missing after registration", context.chat_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockChatRepository;
    use crate::domain::{ChatId, ChatProfile, ErrorCode};
    use crate::test_support::InMemoryChatRepository;
    use mockall::predicate::eq;

    fn context() -> ChatContext {
        ChatContext {
            chat_id: ChatId::new(501),
            profile: ChatProfile {
                username: Some("ada".into()),
                language_code: Some("ru".into()),
                ..ChatProfile::default()
            },
        }
    }

    #[tokio::test]
    async fn existing_chat_is_returned_without_insert() {
        let stored = Chat::new(ChatId::new(501), ChatProfile::default());
        let returned = stored.clone();
        let mut repo = MockChatRepository::new();
        repo.expect_find()
            .with(eq(ChatId::new(501)))
            .times(1)
            .return_once(move |_| Ok(Some(returned)));
        repo.expect_insert_if_absent().never();

        let chat = ChatRegistry::new(Arc::new(repo))
            .ensure(&context())
            .await
            .expect("chat");
        assert_eq!(chat, stored);
    }

    #[tokio::test]
    async fn new_chat_is_inserted_then_read_back() {
        let mut repo = MockChatRepository::new();
        let mut seq = mockall::Sequence::new();
        repo.expect_find()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Ok(None));
        repo.expect_insert_if_absent()
            .withf(|chat| chat.id == ChatId::new(501) && chat.profile.username.as_deref() == Some("ada"))
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Ok(()));
        repo.expect_find()
            .times(1)
            .in_sequence(&mut seq)
            .return_once(|_| Ok(Some(Chat::new(ChatId::new(501), context().profile))));

        let chat = ChatRegistry::new(Arc::new(repo))
            .ensure(&context())
            .await
            .expect("chat");
        assert_eq!(chat.locale(), crate::domain::Locale::Ru);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_first_contacts_store_one_row() {
        let repo = Arc::new(InMemoryChatRepository::default());
        let first = ChatRegistry::new(repo.clone());
        let second = first.clone();
        let ctx = context();

        let (left, right) = tokio::join!(first.ensure(&ctx), second.ensure(&ctx));

        assert_eq!(left.expect("first contact"), right.expect("second contact"));
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn connection_failure_maps_to_service_unavailable() {
        let mut repo = MockChatRepository::new();
        repo.expect_find()
            .return_once(|_| Err(ChatRepositoryError::connection("pool exhausted")));

        let err = ChatRegistry::new(Arc::new(repo))
            .ensure(&context())
            .await
            .expect_err("registry failure");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
