//! PostgreSQL-backed `ChatRepository`.
//!
//! The `chats` primary key arbitrates registration races.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{ChatRepository, ChatRepositoryError};
use crate::domain::{Chat, ChatId, ChatProfile};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{ChatRow, NewChatRow};
use super::pool::DbPool;
use super::schema::chats;

#[derive(Clone)]
pub struct DieselChatRepository {
    pool: DbPool,
}

impl DieselChatRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_error(error: diesel::result::Error) -> ChatRepositoryError {
    map_diesel_error(
        error,
        ChatRepositoryError::query,
        ChatRepositoryError::connection,
    )
}

fn row_to_chat(row: ChatRow) -> Chat {
    Chat::new(
        ChatId::new(row.id),
        ChatProfile {
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            language_code: row.language_code,
            chat_type: row.chat_type,
        },
    )
}

fn new_row(chat: &Chat) -> NewChatRow<'_> {
    let profile = &chat.profile;
    NewChatRow {
        id: chat.id.as_i64(),
        username: profile.username.as_deref(),
        first_name: profile.first_name.as_deref(),
        last_name: profile.last_name.as_deref(),
        language_code: profile.language_code.as_deref(),
        chat_type: profile.chat_type.as_deref(),
    }
}

#[async_trait]
impl ChatRepository for DieselChatRepository {
    /// `INSERT … ON CONFLICT (id) DO NOTHING`: concurrent first contacts
    /// race on the primary key and the loser's insert is a no-op.
    async fn insert_if_absent(&self, chat: &Chat) -> Result<(), ChatRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ChatRepositoryError::connection))?;
        diesel::insert_into(chats::table)
            .values(new_row(chat))
            .on_conflict(chats::id)
            .do_nothing()
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn find(&self, id: ChatId) -> Result<Option<Chat>, ChatRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ChatRepositoryError::connection))?;

        chats::table
            .filter(chats::id.eq(id.as_i64()))
            .select(ChatRow::as_select())
            .first::<ChatRow>(&mut conn)
            .await
            .optional()
            .map(|row| row.map(row_to_chat))
            .map_err(map_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::debug_query;
    use diesel::pg::Pg;
    use rstest::rstest;

    fn chat() -> Chat {
        Chat::new(
            ChatId::new(77),
            ChatProfile {
                chat_type: Some("private".into()),
                ..ChatProfile::default()
            },
        )
    }

    #[rstest]
    fn registration_ignores_existing_rows() {
        let chat = chat();
        let insert = diesel::insert_into(chats::table)
            .values(new_row(&chat))
            .on_conflict(chats::id)
            .do_nothing();

        let sql = debug_query::<Pg, _>(&insert).to_string();

        assert!(sql.contains("ON CONFLICT (\"id\") DO NOTHING"), "{sql}");
    }

    #[rstest]
    fn chat_kind_maps_to_the_type_column() {
        let chat = chat();
        let insert = diesel::insert_into(chats::table).values(new_row(&chat));
        let select = chats::table.select(ChatRow::as_select());

        let insert_sql = debug_query::<Pg, _>(&insert).to_string();
        let select_sql = debug_query::<Pg, _>(&select).to_string();

        assert!(insert_sql.contains("\"type\""), "{insert_sql}");
        assert!(select_sql.contains("\"chats\".\"type\""), "{select_sql}");
        assert!(!select_sql.contains("chat_type"), "{select_sql}");
    }
}
