//! Chat identity and profile captured at first contact.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::messages::Locale;

/// Platform chat identifier.
///
/// Telegram chat ids are signed 64-bit integers; group chats are negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(i64);

impl ChatId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Optional profile attributes reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
    pub chat_type: Option<String>,
}

/// A registered chat.
///
/// The profile is written once when the chat is first seen and never
/// refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub profile: ChatProfile,
}

impl Chat {
    pub fn new(id: ChatId, profile: ChatProfile) -> Self {
        Self { id, profile }
    }

    /// Locale used for replies to this chat.
    pub fn locale(&self) -> Locale {
        Locale::from_language_code(self.profile.language_code.as_deref())
    }
}
