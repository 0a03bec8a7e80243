//! Test utilities for the stylebot crate.
//!
//! In-memory adapters for every driven port plus recording doubles. Unit
//! tests use them directly; integration tests (in `tests/`) reach them
//! through the `test-support` feature.

use std::sync::{Mutex, MutexGuard, PoisonError};

mod fulfillment;
mod in_memory;
mod messaging;

pub use fulfillment::{ImmediateSleeper, MutableClock, NoJitter, RecordingSleeper};
pub use in_memory::{
    InMemoryChatRepository, InMemoryImageStore, InMemoryJobQueue, InMemoryOrderRepository,
};
pub use messaging::{RecordingMessenger, ScriptedImageGenerator};

/// Lock a test mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
