//! Ring buffer holding the events waiting to be dispatched

use crate::config::OverflowPolicy;
use crate::types::QueueError;

/// A FIFO ring buffer with an explicit overflow policy
///
/// Items are pushed at the head and popped from the tail. When the buffer is full,
/// [`OverflowPolicy::Reject`] refuses the new item and [`OverflowPolicy::Grow`] doubles
/// the capacity. Pending items are never overwritten.
#[derive(Debug)]
pub struct EventQueue<T> {
    slots: Vec<Option<T>>,
    head: usize,
    tail: usize,
    len: usize,
    policy: OverflowPolicy,
}

impl<T> EventQueue<T> {
    /// Create a queue of the given capacity
    ///
    /// The capacity is at least one.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            head: 0,
            tail: 0,
            len: 0,
            policy,
        }
    }

    /// Number of pending items
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no item is pending
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current capacity
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Push an item at the head of the queue
    ///
    /// On failure the item is dropped.
    pub fn push(&mut self, item: T) -> Result<(), QueueError> {
        if self.len == self.capacity() {
            match self.policy {
                OverflowPolicy::Reject => {
                    return Err(QueueError::Full { capacity: self.capacity() })
                }
                OverflowPolicy::Grow => self.grow(),
            }
        }
        self.slots[self.head] = Some(item);
        self.head = (self.head + 1) % self.capacity();
        self.len += 1;
        Ok(())
    }

    /// Make room for `additional` items, so that pushing them cannot fail
    ///
    /// With [`OverflowPolicy::Reject`] this fails if the queue cannot hold them all, and
    /// nothing is pushed. With [`OverflowPolicy::Grow`] the capacity is doubled as needed.
    pub fn reserve(&mut self, additional: usize) -> Result<(), QueueError> {
        let needed = self.len + additional;
        match self.policy {
            OverflowPolicy::Reject if needed > self.capacity() => {
                Err(QueueError::Full { capacity: self.capacity() })
            }
            OverflowPolicy::Reject => Ok(()),
            OverflowPolicy::Grow => {
                while needed > self.capacity() {
                    self.grow();
                }
                Ok(())
            }
        }
    }

    /// Pop the oldest item
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.tail].take();
        self.tail = (self.tail + 1) % self.capacity();
        self.len -= 1;
        item
    }

    /// Drop every pending item
    pub fn clear(&mut self) {
        while self.pop().is_some() {}
        self.head = 0;
        self.tail = 0;
    }

    // double the capacity, moving pending items to the front in order
    fn grow(&mut self) {
        let capacity = self.capacity() * 2;
        let mut slots: Vec<Option<T>> = Vec::with_capacity(capacity);
        while let Some(item) = self.pop() {
            slots.push(Some(item));
        }
        let len = slots.len();
        slots.resize_with(capacity, || None);
        self.slots = slots;
        self.tail = 0;
        self.head = len;
        self.len = len;
    }
}
