// crates/dispatchq/src/priority.rs
//! `PriorityQueue`: a [`BaseQueue`] fronted by a heap keyed on caller-supplied
//! priority rather than time. A single background thread flushes the whole
//! heap once per `sort_window`, in ascending-priority order.

use parking_lot::Mutex;
use std::hash::Hash;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::base::BaseQueue;
use crate::callback::{Callback, NoopCallback, PriorityCallback};
use crate::cancel::CancelToken;
use crate::config::QueueConfig;
use crate::heap::TimedHeap;

/// Composes [`BaseQueue`] with a [`TimedHeap`] keyed by priority instead of
/// deadline. Lower `priority` values are dispatched first.
pub struct PriorityQueue<T, C = NoopCallback>
where
    T: Eq + Hash + Clone + Send + 'static,
    C: PriorityCallback<T> + Clone + 'static,
{
    base: Arc<BaseQueue<T, C>>,
    heap: Arc<Mutex<TimedHeap<T>>>,
    cancel: Arc<CancelToken>,
    callback: C,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl<T> PriorityQueue<T, NoopCallback>
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

impl<T> Default for PriorityQueue<T, NoopCallback>
where
    T: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> PriorityQueue<T, C>
where
    T: Eq + Hash + Clone + Send + 'static,
    C: PriorityCallback<T> + Clone + 'static,
{
    pub fn with_callback(callback: C) -> Self {
        Self::with_config(QueueConfig::default(), callback)
    }

    pub fn named_with_callback(name: impl Into<String>, callback: C) -> Self {
        Self::with_config(QueueConfig::named(name), callback)
    }

    /// Construct with an explicit flush window instead of the default
    /// [`MIN_TICK`](crate::MIN_TICK), on par with [`Self::with_callback`].
    pub fn with_window(window: Duration, callback: C) -> Self {
        Self::named_with_window(String::new(), window, callback)
    }

    pub fn named_with_window(name: impl Into<String>, window: Duration, callback: C) -> Self {
        let config = QueueConfig {
            sort_window: window,
            ..QueueConfig::named(name)
        };
        Self::with_config(config, callback)
    }

    pub fn with_config(config: QueueConfig, callback: C) -> Self {
        let base = Arc::new(BaseQueue::named_with_callback(
            config.name.clone(),
            callback.clone(),
        ));
        let heap = Arc::new(Mutex::new(TimedHeap::new()));
        let cancel = Arc::new(CancelToken::new());
        let sort_window = config.sort_window();

        let thread = {
            let base = base.clone();
            let heap = heap.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || flush_loop(base, heap, cancel, sort_window))
        };

        Self {
            base,
            heap,
            cancel,
            callback,
            thread: Mutex::new(Some(thread)),
        }
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn add(&self, item: T) {
        self.base.add(item);
    }

    /// Add `item`, to be dispatched to the base queue on the next flush, in
    /// ascending order of `priority` relative to whatever else is waiting.
    /// `priority <= 0` is dispatched synchronously, identical to
    /// [`Self::add`].
    #[tracing::instrument(skip(self, item), fields(queue = self.name()))]
    pub fn add_weight(&self, item: T, priority: i64) {
        if self.is_shutting_down() {
            return;
        }
        if priority <= 0 {
            self.callback.on_weight(&item, priority);
            self.base.add(item);
            return;
        }
        let mut h = self.heap.lock();
        self.callback.on_weight(&item, priority);
        h.push(item, priority);
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
        if let Some(t) = self.thread.lock().take() {
            let _ = t.join();
        }
        self.heap.lock().reset();
    }
}

fn flush_loop<T, C>(
    base: Arc<BaseQueue<T, C>>,
    heap: Arc<Mutex<TimedHeap<T>>>,
    cancel: Arc<CancelToken>,
    sort_window: Duration,
) where
    T: Eq + Hash + Clone + Send + 'static,
    C: Callback<T>,
{
    loop {
        if cancel.wait_timeout(sort_window) {
            return;
        }
        loop {
            let next = heap.lock().pop();
            match next {
                Some(entry) => base.add(entry.payload),
                None => break,
            }
        }
    }
}
