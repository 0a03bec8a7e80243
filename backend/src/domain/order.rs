//! Orders and their lifecycle.
//!
//! An order is created from an uploaded photo, receives a [`Style`] once the
//! user picks one, and moves through [`OrderStatus`] as payment and
//! fulfillment progress.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ChatId, ObjectKey};

/// Sequential order identifier assigned by storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i64);

impl OrderId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OrderId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self)
    }
}

/// Raised when a style slug is not one of the supported styles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown style: {0}")]
pub struct UnknownStyle(pub String);

/// Visual style a photo can be transformed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Pixar,
    Anime,
    Ghibli,
    Disney,
}

impl Style {
    /// Every style, in keyboard order.
    pub const ALL: [Style; 4] = [Style::Pixar, Style::Anime, Style::Ghibli, Style::Disney];

    /// Lowercase identifier used in storage and callback data.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Pixar => "pixar",
            Self::Anime => "anime",
            Self::Ghibli => "ghibli",
            Self::Disney => "disney",
        }
    }

    /// Display label shown on buttons and in captions.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pixar => "Pixar",
            Self::Anime => "Anime",
            Self::Ghibli => "Ghibli",
            Self::Disney => "Disney",
        }
    }

    /// Instruction sent to the image generator.
    pub fn prompt(self) -> String {
        format!("Convert this photo to {} style", self.slug())
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Style {
    type Err = UnknownStyle;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|style| style.slug() == s)
            .ok_or_else(|| UnknownStyle(s.to_owned()))
    }
}

/// Raised when a status string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

/// Lifecycle state of an order.
///
/// ```text
/// pending -> processing -> processed -> sent
///    \____________\____________\______> failed
/// ```
///
/// `sent` and `failed` are terminal. `processing` may be re-entered so that
/// redelivered jobs can restart generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Processed,
    Sent,
    Failed,
}

impl OrderStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Sent | Self::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    ///
    /// # Examples
    /// ```
    /// use stylebot::domain::OrderStatus;
    ///
    /// assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
    /// assert!(!OrderStatus::Sent.can_transition_to(OrderStatus::Processing));
    /// ```
    pub const fn can_transition_to(self, next: OrderStatus) -> bool {
        match self {
            Self::Pending => matches!(next, Self::Processing | Self::Failed),
            Self::Processing => matches!(next, Self::Processing | Self::Processed | Self::Failed),
            Self::Processed => matches!(next, Self::Sent | Self::Failed),
            Self::Sent | Self::Failed => false,
        }
    }

    /// Statuses from which `self` may be entered.
    pub fn allowed_predecessors(self) -> Vec<OrderStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(self))
            .collect()
    }

    pub const ALL: [OrderStatus; 5] = [
        Self::Pending,
        Self::Processing,
        Self::Processed,
        Self::Sent,
        Self::Failed,
    ];

    /// Decode a persisted status, treating unknown values as `pending`.
    pub fn from_stored(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|err: UnknownStatus| {
            warn!(error = %err, "unknown stored order status; treating as pending");
            Self::Pending
        })
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

/// Snapshot of an order row.
///
/// Field names match the `orders` columns; the same shape travels inside
/// fulfillment jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub chat_id: ChatId,
    pub input_image_path: ObjectKey,
    pub output_image_path: Option<ObjectKey>,
    pub style: Option<Style>,
    pub status: OrderStatus,
    pub error: Option<String>,
    pub payment_charge_id: Option<String>,
}

impl Order {
    /// A freshly created order awaiting style selection.
    pub fn pending(
        id: OrderId,
        chat_id: ChatId,
        input_image_path: ObjectKey,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            created_at,
            chat_id,
            input_image_path,
            output_image_path: None,
            style: None,
            status: OrderStatus::Pending,
            error: None,
            payment_charge_id: None,
        }
    }
}

/// Values supplied when creating an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub chat_id: ChatId,
    pub input_image_path: ObjectKey,
}
