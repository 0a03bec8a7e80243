//! HTTP inbound adapter exposing the Telegram webhook and health endpoints.

pub mod dto;
pub mod error;
pub mod health;
pub mod state;
pub mod webhook;

pub use health::HealthState;
pub use state::HttpState;
