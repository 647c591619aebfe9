// crates/dispatchq/src/error.rs

use thiserror::Error;

/// Public error taxonomy for `dispatchq` and bounded-ring extensions built
/// on top of it.
///
/// None of these are raised by `BaseQueue`, `TimedHeap`, `DelayedQueue`, or
/// `PriorityQueue` on their documented hot paths: a closed queue silently
/// drops `add`, `get` signals closure with `None`, and `done` on an unknown
/// item is a no-op. The taxonomy exists for callers and for extensions that
/// want typed failures (e.g. a bounded ring buffer built on `TimedHeap`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("queue is closed")]
    Closed,

    #[error("queue is full")]
    Full,

    #[error("queue is empty")]
    Empty,

    #[error("item already exists in queue")]
    ItemAlreadyExists,

    #[error("ring index {index} out of range for length {len}")]
    RingOutOfRange { index: usize, len: usize },

    #[error("ring array: invalid argument: {0}")]
    RingInvalidArgument(String),
}
