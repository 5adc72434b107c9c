// src/value_index.rs

// First-occurrence index over a sorted sequence of values.

use simple_sds::bit_vector::BitVector;
use simple_sds::ops::{BitVec, Rank, Select};
use simple_sds::raw_vector::{AccessRaw, RawVector};
use simple_sds::sparse_vector::{SparseBuilder, SparseVector};

/// Finds the first occurrence of each value in a sorted input.
///
/// `values` marks the values that are present and `first_occ` marks the input
/// positions where a new value starts.
pub struct ValueIndex {
    values: SparseVector,
    first_occ: BitVector,
}

impl ValueIndex {
    /// Builds the index using `get` to extract the value of each element.
    /// The values must be in non-decreasing order.
    pub fn new<T, F>(input: &[T], get: F) -> Self
    where
        F: Fn(&T) -> usize,
    {
        let mut buffer: Vec<usize> = Vec::new();
        let mut first_occ = RawVector::with_len(input.len(), false);
        for (i, element) in input.iter().enumerate() {
            let curr = get(element);
            if buffer.last() != Some(&curr) {
                debug_assert!(buffer.last().map_or(true, |&prev| prev < curr), "ValueIndex: unsorted input");
                buffer.push(curr);
                first_occ.set_bit(i, true);
            }
        }

        let universe = buffer.last().map_or(0, |&max| max + 1);
        let mut builder = SparseBuilder::new(universe, buffer.len())
            .expect("value count cannot exceed the universe");
        for &value in buffer.iter() {
            builder.set(value);
        }
        let values = SparseVector::try_from(builder).expect("all values were set");

        let mut first_occ = BitVector::from(first_occ);
        first_occ.enable_select();

        ValueIndex { values, first_occ }
    }

    /// Number of input elements.
    pub fn len(&self) -> usize {
        self.first_occ.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct values.
    pub fn distinct(&self) -> usize {
        self.values.count_ones()
    }

    /// Position of the first occurrence of `value`, or `self.len()` if the value is absent.
    pub fn find(&self, value: usize) -> usize {
        if value >= self.values.len() || !self.values.get(value) {
            return self.len();
        }
        self.first_occ
            .select(self.values.rank(value))
            .unwrap_or(self.len())
    }
}
