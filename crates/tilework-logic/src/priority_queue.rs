//! Indexed binary min-heap keyed by `f32` priority.
//!
//! A `HashMap` mirrors each item's heap slot so membership is O(1) and a
//! priority can be changed in place in O(log n). Equal priorities pop in
//! insertion order.

use crate::error::QueueError;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct Node<T> {
    item: T,
    priority: f32,
    seq: u64,
}

/// Min-priority queue with in-place priority updates.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T: Eq + Hash + Clone> {
    heap: Vec<Node<T>>,
    index: HashMap<T, usize>,
    next_seq: u64,
}

impl<T: Eq + Hash + Clone> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            index: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.index.contains_key(item)
    }

    /// Insert a new item. Fails if it is already queued.
    pub fn enqueue(&mut self, item: T, priority: f32) -> Result<(), QueueError> {
        if self.index.contains_key(&item) {
            return Err(QueueError::AlreadyQueued);
        }
        let slot = self.heap.len();
        self.index.insert(item.clone(), slot);
        self.heap.push(Node {
            item,
            priority,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.sift_up(slot);
        Ok(())
    }

    /// Insert the item, or move it to `priority` if it is already queued.
    pub fn enqueue_or_update(&mut self, item: T, priority: f32) {
        match self.index.get(&item) {
            Some(&slot) => self.reprioritize(slot, priority),
            None => {
                // Not present, so this cannot fail
                let _ = self.enqueue(item, priority);
            }
        }
    }

    /// Change the priority of a queued item.
    pub fn update_priority(&mut self, item: &T, priority: f32) -> Result<(), QueueError> {
        let slot = *self.index.get(item).ok_or(QueueError::NotQueued)?;
        self.reprioritize(slot, priority);
        Ok(())
    }

    /// Current priority of a queued item.
    pub fn priority(&self, item: &T) -> Result<f32, QueueError> {
        self.index
            .get(item)
            .map(|&slot| self.heap[slot].priority)
            .ok_or(QueueError::NotQueued)
    }

    /// The minimum item without removing it.
    pub fn peek(&self) -> Option<(&T, f32)> {
        self.heap.first().map(|n| (&n.item, n.priority))
    }

    /// Remove and return the item with the lowest priority.
    pub fn dequeue(&mut self) -> Option<T> {
        self.dequeue_with_priority().map(|(item, _)| item)
    }

    pub fn dequeue_with_priority(&mut self) -> Option<(T, f32)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let node = self.heap.pop()?;
        self.index.remove(&node.item);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((node.item, node.priority))
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.index.clear();
    }

    fn reprioritize(&mut self, slot: usize, priority: f32) {
        let old = self.heap[slot].priority;
        self.heap[slot].priority = priority;
        match priority.total_cmp(&old) {
            Ordering::Less => self.sift_up(slot),
            Ordering::Greater => self.sift_down(slot),
            Ordering::Equal => {}
        }
    }

    fn less(&self, a: usize, b: usize) -> bool {
        let (x, y) = (&self.heap[a], &self.heap[b]);
        match x.priority.total_cmp(&y.priority) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => x.seq < y.seq,
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        if let Some(slot) = self.index.get_mut(&self.heap[a].item) {
            *slot = a;
        }
        if let Some(slot) = self.index.get_mut(&self.heap[b].item) {
            *slot = b;
        }
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.less(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }
}
