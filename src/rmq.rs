// src/rmq.rs

// Sparse-table range-minimum queries over small values.

/// Range-minimum structure answering `min(values[left..=right])` in constant time.
///
/// Level `k` stores the minimum of each window of `1 << k` values, so the
/// structure takes `n log n` bytes.
#[derive(Clone, Debug, Default)]
pub struct RangeMin {
    levels: Vec<Vec<u8>>,
}

impl RangeMin {
    pub fn new(values: Vec<u8>) -> Self {
        let n = values.len();
        let mut levels = vec![values];
        let mut width = 1;
        while 2 * width <= n {
            let prev = &levels[levels.len() - 1];
            let next: Vec<u8> = (0..=n - 2 * width)
                .map(|i| prev[i].min(prev[i + width]))
                .collect();
            levels.push(next);
            width *= 2;
        }
        RangeMin { levels }
    }

    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, |level| level.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Minimum value in the closed range `[left, right]`.
    ///
    /// # Panics
    ///
    /// Panics if `left > right` or `right >= self.len()`.
    #[inline]
    pub fn min(&self, left: usize, right: usize) -> u8 {
        assert!(left <= right && right < self.len(), "RangeMin::min(): invalid range [{}, {}]", left, right);
        let level = (usize::BITS - 1 - (right - left + 1).leading_zeros()) as usize;
        let width = 1 << level;
        self.levels[level][left].min(self.levels[level][right + 1 - width])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_matches_naive_minimum() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        for n in [1usize, 2, 3, 7, 8, 9, 64, 100] {
            let values: Vec<u8> = (0..n).map(|_| rng.gen_range(0..16)).collect();
            let rmq = RangeMin::new(values.clone());
            assert_eq!(rmq.len(), n);
            for left in 0..n {
                for right in left..n {
                    let naive = *values[left..=right].iter().min().unwrap();
                    assert_eq!(rmq.min(left, right), naive, "range [{}, {}]", left, right);
                }
            }
        }
    }

    #[test]
    fn test_empty() {
        let rmq = RangeMin::new(Vec::new());
        assert!(rmq.is_empty());
    }
}
