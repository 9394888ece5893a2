//! Ordered hand-off of values decided under a component's state lock.
//!
//! Components decide what to publish while holding their state lock but must
//! publish after releasing it, since a subscriber may call back into the same
//! component. The outbox lives inside that state: decisions are queued in
//! lock order and a single caller at a time drains them, so publications
//! leave in the order they were decided even when several threads feed the
//! component.

use std::collections::VecDeque;

#[derive(Debug)]
pub(crate) struct Outbox<T> {
    queue: VecDeque<T>,
    draining: bool,
}

impl<T> Default for Outbox<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            draining: false,
        }
    }
}

impl<T> Outbox<T> {
    /// Queue `item`. Returns `true` when the caller became the drainer and
    /// must publish until [`Outbox::next`] runs dry.
    pub(crate) fn push(&mut self, item: T) -> bool {
        self.queue.push_back(item);
        !std::mem::replace(&mut self.draining, true)
    }

    /// Next item to publish. Releases the drainer role once empty.
    pub(crate) fn next(&mut self) -> Option<T> {
        let item = self.queue.pop_front();
        if item.is_none() {
            self.draining = false;
        }
        item
    }
}
