// src/priority_queue.rs

use std::ops::{Index, IndexMut};

/// Binary min-heap over a backing array, maintained manually for k-way merges.
///
/// Elements can be written through indexing and the heap property restored with
/// [`heapify`](Self::heapify) or [`down`](Self::down).
#[derive(Clone, Debug, Default)]
pub struct PriorityQueue<T: Ord> {
    data: Vec<T>,
}

impl<T: Ord> From<Vec<T>> for PriorityQueue<T> {
    fn from(data: Vec<T>) -> Self {
        PriorityQueue { data }
    }
}

impl<T: Ord> PriorityQueue<T> {
    pub fn with_capacity(n: usize) -> Self {
        PriorityQueue {
            data: Vec::with_capacity(n),
        }
    }

    /// Appends without restoring the heap property.
    pub fn push(&mut self, element: T) {
        self.data.push(element);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn parent(i: usize) -> usize {
        (i - 1) / 2
    }

    #[inline]
    pub fn left(i: usize) -> usize {
        2 * i + 1
    }

    #[inline]
    pub fn right(i: usize) -> usize {
        2 * i + 2
    }

    #[inline]
    fn smaller(&self, i: usize, j: usize) -> usize {
        if self.data[j] < self.data[i] {
            j
        } else {
            i
        }
    }

    /// Sifts the element at `i` down until both children are no smaller.
    pub fn down(&mut self, mut i: usize) {
        while Self::left(i) < self.len() {
            let mut next = self.smaller(i, Self::left(i));
            if Self::right(i) < self.len() {
                next = self.smaller(next, Self::right(i));
            }
            if next == i {
                return;
            }
            self.data.swap(i, next);
            i = next;
        }
    }

    pub fn heapify(&mut self) {
        if self.len() <= 1 {
            return;
        }
        for i in (0..=Self::parent(self.len() - 1)).rev() {
            self.down(i);
        }
    }

    /// Removes the root and restores the heap property.
    pub fn remove_root(&mut self) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let root = self.data.swap_remove(0);
        self.down(0);
        Some(root)
    }

    pub fn is_heap(&self) -> bool {
        (1..self.len()).all(|i| self.data[Self::parent(i)] <= self.data[i])
    }
}

impl<T: Ord> Index<usize> for PriorityQueue<T> {
    type Output = T;

    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T: Ord> IndexMut<usize> for PriorityQueue<T> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}
