// crates/dispatchq/src/lib.rs
//! An in-process, concurrent work dispatch queue.
//!
//! [`BaseQueue`] is a FIFO with at-most-one-in-flight-per-item semantics: an
//! item re-added while already being processed is coalesced and redelivered
//! once the in-flight copy is marked [`BaseQueue::done`], rather than
//! delivered twice or dropped. [`DelayedQueue`] and [`PriorityQueue`] front a
//! `BaseQueue` with a time- or priority-ordered heap and a background thread
//! that feeds items into the base queue as they come due.
//!
//! None of the three queues depend on an async runtime: `BaseQueue::get`
//! blocks the calling thread directly, and the delayed/priority background
//! loops are plain `std::thread`s woken by a condvar-backed
//! [`CancelToken`](cancel::CancelToken), the same primitive family
//! (`parking_lot::{Mutex, Condvar}`) `BaseQueue` itself is built on.

mod base;
mod callback;
mod cancel;
mod config;
mod delayed;
mod error;
mod heap;
mod priority;

pub use base::BaseQueue;
pub use callback::{Callback, DelayingCallback, NoopCallback, PriorityCallback};
pub use config::{QueueConfig, MIN_TICK};
pub use delayed::DelayedQueue;
pub use error::Error;
pub use heap::{TimedHeap, WaitingFor};
pub use priority::PriorityQueue;

pub type Result<T> = std::result::Result<T, Error>;
