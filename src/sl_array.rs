// src/sl_array.rs

use std::collections::BTreeMap;

/// A byte array of counters that stores large values in a map. Values start as 0s.
///
/// A position holding [`SLArray::LARGE_VALUE`] keeps its true count in the map.
/// There is no internal locking: concurrent increments to the same position
/// must be prevented by the caller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SLArray {
    data: Vec<u8>,
    large_values: BTreeMap<usize, usize>,
}

impl SLArray {
    pub const LARGE_VALUE: u8 = 255;

    pub fn new(n: usize) -> Self {
        SLArray {
            data: vec![0; n],
            large_values: BTreeMap::new(),
        }
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
    pub fn get(&self, i: usize) -> usize {
        if self.data[i] == Self::LARGE_VALUE {
            self.large_values[&i]
        } else {
            self.data[i] as usize
        }
    }

    /// Has the counter at `i` escaped to the map?
    #[inline]
    pub fn is_overflowed(&self, i: usize) -> bool {
        self.data[i] == Self::LARGE_VALUE
    }

    #[inline]
    pub fn increment(&mut self, i: usize) {
        if self.data[i] == Self::LARGE_VALUE {
            *self.large_values.entry(i).or_insert(Self::LARGE_VALUE as usize) += 1;
        } else {
            self.data[i] += 1;
            if self.data[i] == Self::LARGE_VALUE {
                self.large_values.insert(i, Self::LARGE_VALUE as usize);
            }
        }
    }

    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.large_values.clear();
    }
}
