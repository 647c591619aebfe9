// crates/dispatchq/src/callback.rs
//! Capability-trait callback hooks.
//!
//! `Callback` covers the three lifecycle hooks every queue fires;
//! `DelayingCallback` and `PriorityCallback` extend it with the hook fired
//! before an item enters the delayed/priority heap respectively. All methods
//! default to doing nothing, so implementors only override what they need,
//! and `NoopCallback` (the default type parameter on every queue) costs
//! nothing at the call site.
//!
//! Callbacks are invoked while the queue's internal lock is held (see the
//! locking discipline in the crate's design notes). They must be fast and
//! must not call back into the same queue.

use std::sync::Arc;
use std::time::Duration;

/// Core lifecycle hooks fired by [`crate::BaseQueue`].
pub trait Callback<T>: Send + Sync {
    /// Invoked just before an item is enqueued (after dedup has already
    /// been decided — fires even when the item is coalesced into the
    /// existing dirty entry).
    fn on_add(&self, _item: &T) {}

    /// Invoked just before an item is handed to a consumer.
    fn on_get(&self, _item: &T) {}

    /// Invoked just after an item is marked done.
    fn on_done(&self, _item: &T) {}
}

/// Extra hook for [`crate::DelayedQueue`], invoked before the heap insert
/// regardless of whether the `duration == 0` fast path applies.
pub trait DelayingCallback<T>: Callback<T> {
    fn on_after(&self, _item: &T, _duration: Duration) {}
}

/// Extra hook for [`crate::PriorityQueue`], invoked before the heap insert
/// regardless of whether the `priority <= 0` fast path applies.
pub trait PriorityCallback<T>: Callback<T> {
    fn on_weight(&self, _item: &T, _priority: i64) {}
}

/// The "no callback" callback. Used as the default type parameter so a
/// queue constructed without one pays no branch on its hot paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallback;

impl<T> Callback<T> for NoopCallback {}
impl<T> DelayingCallback<T> for NoopCallback {}
impl<T> PriorityCallback<T> for NoopCallback {}

impl<T, C: Callback<T> + ?Sized> Callback<T> for Arc<C> {
    fn on_add(&self, item: &T) {
        (**self).on_add(item)
    }

    fn on_get(&self, item: &T) {
        (**self).on_get(item)
    }

    fn on_done(&self, item: &T) {
        (**self).on_done(item)
    }
}

impl<T, C: DelayingCallback<T> + ?Sized> DelayingCallback<T> for Arc<C> {
    fn on_after(&self, item: &T, duration: Duration) {
        (**self).on_after(item, duration)
    }
}

impl<T, C: PriorityCallback<T> + ?Sized> PriorityCallback<T> for Arc<C> {
    fn on_weight(&self, item: &T, priority: i64) {
        (**self).on_weight(item, priority)
    }
}
