// src/lcp.rs

// Longest common prefixes between unique k-mer labels and path label ranges.

use simple_sds::int_vector::IntVector;
use simple_sds::ops::Access;

use crate::codec::{Key, KeyType};
use crate::path_node::{PathNode, RankType};
use crate::rmq::RangeMin;

/// Closed range of k-mer ranks.
pub type RankRange = (RankType, RankType);

/// An lcp value `(x, y)`: `x` ranks of the path labels are shared, and the first
/// diverging k-mers share `y` characters.
pub type LcpPair = (usize, usize);

/// Rank distance below which minima are found by scanning instead of the RMQ.
const SHORT_RANGE: usize = 32;

/// Lcp array of the sorted unique k-mer labels with range-minimum support.
#[derive(Clone, Debug)]
pub struct LCP {
    pub kmer_length: usize,
    pub total_keys: usize,
    /// `kmer_lcp[i]` is the lcp of unique keys `i - 1` and `i`. `kmer_lcp[0]` is unused.
    pub kmer_lcp: IntVector,
    lcp_rmq: RangeMin,
}

impl LCP {
    pub fn new(keys: &[KeyType], kmer_length: usize) -> Self {
        let width = ((usize::BITS - kmer_length.leading_zeros()) as usize).max(1);
        let mut kmer_lcp = IntVector::with_len(keys.len(), width, 0)
            .expect("lcp width is a valid integer width");
        let mut values = vec![0u8; keys.len()];
        for i in 1..keys.len() {
            let lcp = Key::lcp(keys[i - 1], keys[i], kmer_length);
            kmer_lcp.set(i, lcp as u64);
            values[i] = lcp as u8;
        }

        LCP {
            kmer_length,
            total_keys: keys.len(),
            kmer_lcp,
            lcp_rmq: RangeMin::new(values),
        }
    }

    #[inline]
    fn kmer_lcp_at(&self, i: usize) -> usize {
        self.kmer_lcp.get(i) as usize
    }

    /// Minimum of `kmer_lcp[left..=right]`.
    fn range_min(&self, left: usize, right: usize) -> usize {
        if right - left < SHORT_RANGE {
            (left..=right).map(|i| self.kmer_lcp_at(i)).min().unwrap_or(0)
        } else {
            self.lcp_rmq.min(left, right) as usize
        }
    }

    /// Lcp of the unique keys with distinct ranks `x` and `y`.
    fn kmer_lcp_between(&self, x: RankType, y: RankType) -> usize {
        let (left, right) = if x < y { (x, y) } else { (y, x) };
        self.range_min(left as usize + 1, right as usize)
    }

    /// Minimal lcp of the path labels of `a` and `b`.
    ///
    /// `a` must be before `b` in lexicographic order, and the ranges must not overlap.
    pub fn min_lcp(&self, a: &PathNode, b: &PathNode) -> LcpPair {
        let order = a.order().min(b.order());
        let path_lcp = a.min_lcp(b);
        if path_lcp < order {
            (path_lcp, self.kmer_lcp_between(a.first_label[path_lcp], b.last_label[path_lcp]))
        } else {
            (path_lcp, 0)
        }
    }

    /// Maximal lcp of the path labels of `a` and `b`.
    ///
    /// `a` must be before `b` in lexicographic order, and the ranges must not overlap.
    pub fn max_lcp(&self, a: &PathNode, b: &PathNode) -> LcpPair {
        let order = a.order().min(b.order());
        let path_lcp = a.max_lcp(b);
        if path_lcp < order {
            (path_lcp, self.kmer_lcp_between(a.last_label[path_lcp], b.first_label[path_lcp]))
        } else {
            (path_lcp, 0)
        }
    }

    /// Increments the lcp by one character.
    #[inline]
    pub fn increment(&self, mut lcp: LcpPair) -> LcpPair {
        if lcp.1 + 1 < self.kmer_length {
            lcp.1 += 1;
        } else {
            lcp.0 += 1;
            lcp.1 = 0;
        }
        lcp
    }

    /// Extends the given rank range into the maximal range whose keys share `lcp` characters.
    // TODO: An lcp interval tree would avoid the linear walk on long bands.
    pub fn extend_range(&self, mut range: RankRange, lcp: usize) -> RankRange {
        while range.0 > 0 && self.kmer_lcp_at(range.0 as usize) >= lcp {
            range.0 -= 1;
        }
        while (range.1 as usize) + 1 < self.total_keys && self.kmer_lcp_at(range.1 as usize + 1) >= lcp {
            range.1 += 1;
        }
        range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::kmer::KMer;

    fn keys(kmers: &[&[u8]]) -> Vec<KeyType> {
        let alpha = Alphabet::default();
        kmers.iter().map(|kmer| Key::encode(&alpha, kmer, 0, 0)).collect()
    }

    fn path(labels: &[RankType]) -> PathNode {
        let mut node = PathNode::from_kmer(&KMer::new(Key::replace(0, labels[0] as u64), 0, 1));
        for &rank in &labels[1..] {
            let next = PathNode::from_kmer(&KMer::new(Key::replace(0, rank as u64), 1, 2));
            node = PathNode::join(&node, &next).unwrap();
        }
        node
    }

    fn sample() -> LCP {
        LCP::new(&keys(&[b"AAC", b"ACA", b"ACG", b"ACT", b"CAA", b"GAT"]), 3)
    }

    #[test]
    fn test_adjacent_lcp() {
        let lcp = sample();
        let values: Vec<usize> = (0..lcp.total_keys).map(|i| lcp.kmer_lcp_at(i)).collect();
        assert_eq!(values, vec![0, 1, 2, 2, 0, 0]);
    }

    #[test]
    fn test_path_lcp() {
        let lcp = sample();
        assert_eq!(lcp.max_lcp(&path(&[1, 0]), &path(&[3, 2])), (0, 2));
        assert_eq!(lcp.max_lcp(&path(&[1, 0]), &path(&[1, 4])), (1, 0));
        assert_eq!(lcp.min_lcp(&path(&[0, 5]), &path(&[1, 1])), (0, 1));
        assert_eq!(lcp.max_lcp(&path(&[2]), &path(&[2, 3])), (1, 0));
    }

    #[test]
    fn test_range_labels() {
        let lcp = sample();
        let mut a = path(&[0, 0]);
        a.last_label[0] = 2;
        let b = path(&[3, 1]);
        // Closest pair is ACG / ACT, farthest AAC / ACT.
        assert_eq!(lcp.max_lcp(&a, &b), (0, 2));
        assert_eq!(lcp.min_lcp(&a, &b), (0, 1));
    }

    #[test]
    fn test_increment() {
        let lcp = sample();
        assert_eq!(lcp.increment((0, 0)), (0, 1));
        assert_eq!(lcp.increment((0, 1)), (0, 2));
        assert_eq!(lcp.increment((0, 2)), (1, 0));
    }

    #[test]
    fn test_extend_range() {
        let lcp = sample();
        assert_eq!(lcp.extend_range((2, 2), 2), (1, 3));
        assert_eq!(lcp.extend_range((2, 2), 1), (0, 3));
        assert_eq!(lcp.extend_range((5, 5), 1), (5, 5));
        assert_eq!(lcp.extend_range((4, 4), 0), (0, 5));
    }

    #[test]
    fn test_rmq_matches_scan() {
        let mut all = Vec::new();
        for a in [b'A', b'C', b'G', b'T'] {
            for b in [b'A', b'C', b'G', b'T'] {
                for c in [b'A', b'C', b'G', b'T'] {
                    all.push(vec![a, b, c]);
                }
            }
        }
        let slices: Vec<&[u8]> = all.iter().map(|kmer| kmer.as_slice()).collect();
        let lcp = LCP::new(&keys(&slices), 3);
        for left in 1..lcp.total_keys {
            for right in left..lcp.total_keys {
                let naive = (left..=right).map(|i| lcp.kmer_lcp_at(i)).min().unwrap();
                assert_eq!(lcp.lcp_rmq.min(left, right) as usize, naive);
                assert_eq!(lcp.range_min(left, right), naive);
            }
        }
    }
}
