//! Orderings a [`Queue`](super::Queue) can keep its items in.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

/// Backing container of a queue; decides which item `pop` returns.
pub trait Store<T>: Default {
    fn push(&mut self, item: T);
    fn pop(&mut self) -> Option<T>;
    fn len(&self) -> usize;
    fn clear(&mut self);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Oldest item first.
#[derive(Debug)]
pub struct Fifo<T>(VecDeque<T>);

impl<T> Default for Fifo<T> {
    fn default() -> Self {
        Fifo(VecDeque::new())
    }
}

impl<T> Store<T> for Fifo<T> {
    fn push(&mut self, item: T) {
        self.0.push_back(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop_front()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// Newest item first.
#[derive(Debug)]
pub struct Lifo<T>(Vec<T>);

impl<T> Default for Lifo<T> {
    fn default() -> Self {
        Lifo(Vec::new())
    }
}

impl<T> Store<T> for Lifo<T> {
    fn push(&mut self, item: T) {
        self.0.push(item);
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

/// Smallest item first (binary min-heap).
///
/// Items that compare equal come out in no particular order; give them a
/// tie-breaking key if the order matters.
#[derive(Debug)]
pub struct Heap<T: Ord>(BinaryHeap<Reverse<T>>);

impl<T: Ord> Heap<T> {
    /// Heapifies `items` in O(n).
    pub fn from_vec(items: Vec<T>) -> Self {
        Heap(items.into_iter().map(Reverse).collect::<Vec<_>>().into())
    }

    pub fn peek(&self) -> Option<&T> {
        self.0.peek().map(|Reverse(item)| item)
    }
}

impl<T: Ord> Default for Heap<T> {
    fn default() -> Self {
        Heap(BinaryHeap::new())
    }
}

impl<T: Ord> Store<T> for Heap<T> {
    fn push(&mut self, item: T) {
        self.0.push(Reverse(item));
    }

    fn pop(&mut self) -> Option<T> {
        self.0.pop().map(|Reverse(item)| item)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}
