//! OpenAI image-edit outbound adapter.

mod dto;
mod http_generator;

pub use http_generator::{OpenAiHttpGenerator, OpenAiIdentity};
