//! Inbound adapters: the webhook HTTP surface and the queue consumer.

pub mod http;
pub mod worker;
