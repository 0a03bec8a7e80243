//! Telegram Bot API outbound adapter.
//!
//! Implements the `Messenger` port over HTTPS with reqwest.

mod dto;
mod http_messenger;

pub use http_messenger::TelegramHttpMessenger;
