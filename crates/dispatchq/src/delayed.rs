// crates/dispatchq/src/delayed.rs
//! `DelayedQueue`: a [`BaseQueue`] fronted by a time-ordered heap. Items
//! added with [`DelayedQueue::add_after`] sit in the heap until their
//! deadline elapses, then get forwarded into the base queue by a
//! background dispatch thread.

use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::base::BaseQueue;
use crate::callback::{Callback, DelayingCallback, NoopCallback};
use crate::cancel::CancelToken;
use crate::config::QueueConfig;
use crate::heap::TimedHeap;

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_nanos() as i64
}

/// Composes [`BaseQueue`] with a [`TimedHeap`] and a background dispatcher.
/// See the crate-level docs for the locking discipline between `heap_lock`
/// and the base queue's own lock.
pub struct DelayedQueue<T, C = NoopCallback>
where
    T: Eq + Hash + Clone + Send + 'static,
    C: DelayingCallback<T> + Clone + 'static,
{
    base: Arc<BaseQueue<T, C>>,
    heap: Arc<Mutex<TimedHeap<T>>>,
    now: Arc<AtomicI64>,
    cancel: Arc<CancelToken>,
    callback: C,
    threads: Mutex<Option<(JoinHandle<()>, JoinHandle<()>)>>,
}

impl<T> DelayedQueue<T, NoopCallback>
where
    T: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default(), NoopCallback)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::with_config(QueueConfig::named(name), NoopCallback)
    }
}

impl<T> Default for DelayedQueue<T, NoopCallback>
where
    T: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> DelayedQueue<T, C>
where
    T: Eq + Hash + Clone + Send + 'static,
    C: DelayingCallback<T> + Clone + 'static,
{
    pub fn with_callback(callback: C) -> Self {
        Self::with_config(QueueConfig::default(), callback)
    }

    pub fn named_with_callback(name: impl Into<String>, callback: C) -> Self {
        Self::with_config(QueueConfig::named(name), callback)
    }

    pub fn with_config(config: QueueConfig, callback: C) -> Self {
        let base = Arc::new(BaseQueue::named_with_callback(
            config.name.clone(),
            callback.clone(),
        ));
        let heap = Arc::new(Mutex::new(TimedHeap::new()));
        let now = Arc::new(AtomicI64::new(now_nanos()));
        let cancel = Arc::new(CancelToken::new());
        let sync_tick = config.sync_tick();

        let sync_now_handle = {
            let now = now.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || sync_now_loop(now, cancel, sync_tick))
        };
        let waiting_handle = {
            let base = base.clone();
            let heap = heap.clone();
            let now = now.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || waiting_loop(base, heap, now, cancel, sync_tick))
        };

        Self {
            base,
            heap,
            now,
            cancel,
            callback,
            threads: Mutex::new(Some((sync_now_handle, waiting_handle))),
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn add(&self, item: T) {
        self.base.add(item);
    }

    /// Add `item`, to be dispatched to the base queue once `duration` has
    /// elapsed. `duration == Duration::ZERO` is dispatched synchronously,
    /// identical to calling [`Self::add`] directly. Best-effort: deliveries
    /// are rounded up to the next ~500ms tick (see crate docs).
    #[tracing::instrument(skip(self, item), fields(queue = self.name()))]
    pub fn add_after(&self, item: T, duration: Duration) {
        if self.is_shutting_down() {
            return;
        }
        if duration.is_zero() {
            self.callback.on_after(&item, duration);
            self.base.add(item);
            return;
        }
        let score = self
            .now
            .load(Ordering::Relaxed)
            .saturating_add(duration.as_nanos().min(i64::MAX as u128) as i64);
        {
            let mut h = self.heap.lock();
            self.callback.on_after(&item, duration);
            h.push(item, score);
        }
        self.cancel.nudge();
    }

    pub fn get(&self) -> Option<T> {
        self.base.get()
    }

    pub fn done(&self, item: T) {
        self.base.done(item);
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.base.is_shutting_down()
    }

    #[tracing::instrument(skip(self), fields(queue = self.name()))]
    pub fn shutdown(&self) {
        self.base.shutdown();
        self.stop_background();
    }

    #[tracing::instrument(skip(self), fields(queue = self.name()))]
    pub fn shutdown_with_drain(&self) {
        self.base.shutdown_with_drain();
        self.stop_background();
    }

    fn stop_background(&self) {
        self.cancel.cancel();
        if let Some((a, b)) = self.threads.lock().take() {
            let _ = a.join();
            let _ = b.join();
        }
        self.heap.lock().reset();
    }
}

fn sync_now_loop(now: Arc<AtomicI64>, cancel: Arc<CancelToken>, tick: Duration) {
    loop {
        if cancel.wait_timeout(tick) {
            return;
        }
        now.store(now_nanos(), Ordering::Relaxed);
    }
}

fn waiting_loop<T, C>(
    base: Arc<BaseQueue<T, C>>,
    heap: Arc<Mutex<TimedHeap<T>>>,
    now: Arc<AtomicI64>,
    cancel: Arc<CancelToken>,
    tick: Duration,
) where
    T: Eq + Hash + Clone + Send + 'static,
    C: Callback<T>,
{
    loop {
        let sleep_for = {
            let h = heap.lock();
            match h.front() {
                Some(entry) => {
                    let delta = entry.score - now.load(Ordering::Relaxed);
                    if delta <= 0 {
                        Duration::ZERO
                    } else {
                        Duration::from_nanos(delta as u64).min(tick)
                    }
                }
                None => tick,
            }
        };

        if !sleep_for.is_zero() && cancel.wait_timeout(sleep_for) {
            return;
        }
        if cancel.is_cancelled() {
            return;
        }

        loop {
            let due = {
                let mut h = heap.lock();
                match h.front() {
                    Some(entry) if entry.score <= now.load(Ordering::Relaxed) => h.pop(),
                    _ => None,
                }
            };
            match due {
                Some(entry) => base.add(entry.payload),
                None => break,
            }
        }
    }
}
