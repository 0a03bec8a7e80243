//! Telegram photo-stylization bot.
//!
//! `domain` holds the order lifecycle and the ports it drives; `inbound`
//! exposes the webhook and the queue consumer; `outbound` implements the
//! ports against PostgreSQL, the filesystem, Telegram, and OpenAI.

pub mod domain;
pub mod inbound;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
