//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL repositories and the fulfillment queue via Diesel
//! - **storage**: capability-scoped filesystem image store
//! - **telegram**: Bot API client implementing `Messenger`
//! - **openai**: Images API client implementing `ImageGenerator`
//!
//! Adapters translate between domain types and wire or row representations.
//! They contain no business logic.

pub mod openai;
pub mod persistence;
pub mod storage;
pub mod telegram;
