//! FIFO channels between a VM and its host
//!
//! A `Channel` is one queue with any number of handles. Cloning a channel
//! hands out another handle to the same queue, which is how one VM's output
//! becomes another VM's input without copying values between two queues.
//! All access happens on a single logical thread.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// Unbounded FIFO queue of integers shared through handles
#[derive(Clone, Default)]
pub struct Channel {
    queue: Rc<RefCell<VecDeque<i64>>>,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the back of the queue
    pub fn push(&self, value: i64) {
        self.queue.borrow_mut().push_back(value);
    }

    /// Append every value in order
    pub fn extend<I: IntoIterator<Item = i64>>(&self, values: I) {
        self.queue.borrow_mut().extend(values);
    }

    /// Append the bytes of `text` as individual values
    pub fn push_ascii(&self, text: &str) {
        self.extend(text.bytes().map(i64::from));
    }

    /// Remove the value at the front of the queue
    pub fn pop(&self) -> Option<i64> {
        self.queue.borrow_mut().pop_front()
    }

    /// Remove and return every queued value
    pub fn drain(&self) -> Vec<i64> {
        self.queue.borrow_mut().drain(..).collect()
    }

    /// Copy of the queued values without consuming them
    pub fn snapshot(&self) -> Vec<i64> {
        self.queue.borrow().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Whether both handles refer to the same queue
    pub fn is_linked_to(&self, other: &Channel) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.queue.borrow().iter()).finish()
    }
}
