//! Validated object-store keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ChatId, OrderId};

/// Validation failures for [`ObjectKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectKeyError {
    #[error("object key must not be empty")]
    Empty,
    #[error("object key must be relative: {0}")]
    Absolute(String),
    #[error("object key contains an invalid segment: {0}")]
    InvalidSegment(String),
}

/// Relative `/`-separated path naming an object in storage.
///
/// ## Invariants
/// - Never empty or absolute.
/// - Every segment is non-empty and neither `.` nor `..`.
/// - Contains no backslashes or NUL bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate and wrap a raw key.
    ///
    /// # Examples
    /// ```
    /// use stylebot::domain::ObjectKey;
    ///
    /// assert!(ObjectKey::new("42/file_7.jpg").is_ok());
    /// assert!(ObjectKey::new("../etc/passwd").is_err());
    /// ```
    pub fn new(raw: impl Into<String>) -> Result<Self, ObjectKeyError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(ObjectKeyError::Empty);
        }
        if raw.starts_with('/') {
            return Err(ObjectKeyError::Absolute(raw));
        }
        let invalid = raw.split('/').any(|segment| {
            segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains(['\\', '\0'])
        });
        if invalid {
            return Err(ObjectKeyError::InvalidSegment(raw));
        }
        Ok(Self(raw))
    }

    /// Key for an uploaded photo: `<chat_id>/<file_name>`.
    ///
    /// Only the final path component of `file_name` is kept, so platform
    /// paths such as `photos/file_3.jpg` become `file_3.jpg`.
    pub fn input(chat_id: ChatId, file_name: &str) -> Result<Self, ObjectKeyError> {
        let base = file_name.rsplit('/').next().unwrap_or(file_name);
        Self::new(format!("{chat_id}/{base}"))
    }

    /// Key for a generated image: `<chat_id>/output-<order_id>.jpeg`.
    pub fn output(chat_id: ChatId, order_id: OrderId) -> Self {
        Self(format!("{chat_id}/output-{order_id}.jpeg"))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Iterate over the `/`-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = ObjectKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectKey> for String {
    fn from(value: ObjectKey) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("/abs/path.jpg")]
    #[case("a//b")]
    #[case("a/../b")]
    #[case("./a")]
    #[case("a\\b")]
    #[case("trailing/")]
    fn rejects_unsafe_keys(#[case] raw: &str) {
        assert!(ObjectKey::new(raw).is_err(), "{raw:?} should be rejected");
    }

    #[test]
    fn input_key_keeps_only_file_name() {
        let key = ObjectKey::input(ChatId::new(5752), "photos/file_3.jpg").expect("valid key");
        assert_eq!(key.as_str(), "5752/file_3.jpg");
    }

    #[test]
    fn input_key_rejects_parent_reference() {
        assert!(ObjectKey::input(ChatId::new(1), "photos/..").is_err());
    }

    #[test]
    fn output_key_uses_order_id() {
        let key = ObjectKey::output(ChatId::new(-12), OrderId::new(31));
        assert_eq!(key.as_str(), "-12/output-31.jpeg");
    }

    #[test]
    fn deserialisation_validates() {
        let err = serde_json::from_str::<ObjectKey>("\"../x\"");
        assert!(err.is_err());
        let ok: ObjectKey = serde_json::from_str("\"1/a.jpg\"").expect("valid key");
        assert_eq!(ok.segments().collect::<Vec<_>>(), vec!["1", "a.jpg"]);
    }
}
