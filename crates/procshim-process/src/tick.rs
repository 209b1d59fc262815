//! `nextTick` queue
//!
//! Callbacks run FIFO when the embedder drains the queue after the current
//! synchronous work. Callbacks queued while draining run in the same drain.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

type Tick = Box<dyn FnOnce() + Send + 'static>;

/// FIFO microtask queue
#[derive(Default)]
pub struct TickQueue {
    queue: Mutex<VecDeque<Tick>>,
}

impl TickQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `callback`
    pub fn push<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.lock().push_back(Box::new(callback));
    }

    /// Queue `callback(args)`
    pub fn push_with<F, A>(&self, callback: F, args: A)
    where
        F: FnOnce(A) + Send + 'static,
        A: Send + 'static,
    {
        self.push(move || callback(args));
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Run queued callbacks until the queue is empty; returns how many ran
    pub fn run(&self) -> usize {
        let mut ran = 0;
        loop {
            // lock released before the callback runs so it can enqueue more
            let next = self.queue.lock().pop_front();
            match next {
                Some(tick) => {
                    tick();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl fmt::Debug for TickQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickQueue").field("pending", &self.len()).finish()
    }
}
