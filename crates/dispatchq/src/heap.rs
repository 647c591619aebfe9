// crates/dispatchq/src/heap.rs
//! A 4-ary min-heap keyed by an `i64` score, with O(log₄ n) push, pop,
//! delete-at-index, and in-place rekey.
//!
//! Each node has up to four children, at indices `4i+1..=4i+4`, which packs
//! more keys per cache line than a binary heap at the depths this crate's
//! dispatch queues operate at. `std::collections::BinaryHeap` isn't used
//! here because it exposes no O(log n) delete-at-index or rekey, both of
//! which `DelayedQueue`/`PriorityQueue` need in order to reschedule or drop
//! a waiting item without draining the whole heap.
//!
//! Not thread-safe on its own; callers serialize access via their own lock.

/// One entry waiting in a [`TimedHeap`]: a payload plus the score it's
/// ordered by and its current backing-array position.
pub struct WaitingFor<T> {
    pub payload: T,
    pub score: i64,
    index: usize,
}

impl<T> WaitingFor<T> {
    /// Current position in the heap's backing array. Kept in sync on every
    /// swap; this is what makes `delete`/`update_score` O(log n).
    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Default)]
pub struct TimedHeap<T> {
    data: Vec<WaitingFor<T>>,
}

impl<T> TimedHeap<T> {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            data: Vec::with_capacity(cap),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Peek the minimum-score entry without removing it.
    pub fn front(&self) -> Option<&WaitingFor<T>> {
        self.data.first()
    }

    /// Truncate the backing array to empty.
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Push a new entry and sift it up into position.
    pub fn push(&mut self, payload: T, score: i64) {
        let index = self.data.len();
        self.data.push(WaitingFor {
            payload,
            score,
            index,
        });
        self.sift_up(index);
    }

    /// Pop the minimum-score entry, or `None` if the heap is empty.
    pub fn pop(&mut self) -> Option<WaitingFor<T>> {
        let n = self.data.len();
        match n {
            0 => None,
            1 => self.data.pop(),
            _ => {
                self.swap(0, n - 1);
                let popped = self.data.pop();
                self.sift_down(0);
                popped
            }
        }
    }

    /// Remove the entry at backing-array index `i`, wherever it currently
    /// sits, restoring the heap property in O(log n).
    pub fn delete(&mut self, i: usize) -> Option<WaitingFor<T>> {
        let n = self.data.len();
        if i >= n {
            return None;
        }
        if n == 1 {
            return self.data.pop();
        }
        let moves_down = self.data[i].score < self.data[n - 1].score;
        self.swap(i, n - 1);
        let removed = self.data.pop();
        if i < self.data.len() {
            if moves_down {
                self.sift_down(i);
            } else {
                self.sift_up(i);
            }
        }
        removed
    }

    /// Mutate the score of the entry at backing-array index `i` in place,
    /// then restore the heap property.
    pub fn update_score(&mut self, i: usize, new_score: i64) {
        if i >= self.data.len() {
            return;
        }
        let moves_down = new_score > self.data[i].score;
        self.data[i].score = new_score;
        if moves_down {
            self.sift_down(i);
        } else {
            self.sift_up(i);
        }
    }

    fn less(&self, i: usize, j: usize) -> bool {
        self.data[i].score < self.data[j].score
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.data.swap(i, j);
        self.data[i].index = i;
        self.data[j].index = j;
    }

    fn sift_up(&mut self, mut i: usize) {
        while i >= 1 {
            let parent = (i - 1) >> 2;
            if self.less(i, parent) {
                self.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let n = self.data.len();
        loop {
            let c1 = i * 4 + 1;
            if c1 >= n {
                break;
            }
            let c2 = c1 + 1;
            let c3 = c1 + 2;
            let c4 = c1 + 3;

            let mut smallest = c1;
            if c2 < n && self.less(c2, smallest) {
                smallest = c2;
            }
            if c3 < n && self.less(c3, smallest) {
                smallest = c3;
            }
            if c4 < n && self.less(c4, smallest) {
                smallest = c4;
            }

            if self.less(smallest, i) {
                self.swap(i, smallest);
                i = smallest;
            } else {
                break;
            }
        }
    }
}
