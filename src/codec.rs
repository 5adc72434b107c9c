// src/codec.rs

// Fixed-width integer codecs for k-mer keys and graph positions.

use crate::alphabet::Alphabet;
use crate::error::{ConstructionError, Result};

pub type KeyType = u64;
pub type NodeType = u64;

/// Packed k-mer key, most significant bits first:
///   - 16 x 3 bits for the label, high-order characters 0 when the k-mer is shorter
///   - 8 bits marking the predecessor comp values
///   - 8 bits marking the successor comp values
///
/// Intended for k-mers of length 16 or less on alphabets of size 8 or less.
pub struct Key;

impl Key {
    pub const CHAR_WIDTH: usize = 3;
    pub const CHAR_MASK: KeyType = 0x7;
    pub const MAX_LENGTH: usize = 16;
    pub const PRED_SUCC_MASK: KeyType = 0xFFFF;

    #[inline]
    pub fn encode(alpha: &Alphabet, kmer: &[u8], pred: u8, succ: u8) -> KeyType {
        let mut value: KeyType = 0;
        for &symbol in kmer {
            value = (value << Self::CHAR_WIDTH) | alpha.comp(symbol) as KeyType;
        }
        value = (value << 8) | pred as KeyType;
        (value << 8) | succ as KeyType
    }

    /// Decodes the label back into raw symbols.
    pub fn decode(key: KeyType, kmer_length: usize, alpha: &Alphabet) -> String {
        let mut label = Self::label(key);
        let kmer_length = kmer_length.min(Self::MAX_LENGTH);
        let mut res = vec![0u8; kmer_length];
        for i in 1..=kmer_length {
            res[kmer_length - i] = alpha.symbol((label & Self::CHAR_MASK) as u8);
            label >>= Self::CHAR_WIDTH;
        }
        res.into_iter().map(char::from).collect()
    }

    #[inline]
    pub fn label(key: KeyType) -> KeyType {
        key >> 16
    }

    #[inline]
    pub fn predecessors(key: KeyType) -> u8 {
        ((key >> 8) & 0xFF) as u8
    }

    #[inline]
    pub fn successors(key: KeyType) -> u8 {
        (key & 0xFF) as u8
    }

    /// Comp value of the last character of the label.
    #[inline]
    pub fn last(key: KeyType) -> u8 {
        ((key >> 16) & Self::CHAR_MASK) as u8
    }

    /// Adds the predecessors and successors of `key2` to `key1`.
    #[inline]
    pub fn merge(key1: KeyType, key2: KeyType) -> KeyType {
        key1 | (key2 & Self::PRED_SUCC_MASK)
    }

    /// Replaces the label with `kmer_val` (usually the rank of the label).
    #[inline]
    pub fn replace(key: KeyType, kmer_val: u64) -> KeyType {
        (kmer_val << 16) | (key & Self::PRED_SUCC_MASK)
    }

    /// Number of leading characters shared by the labels of `a` and `b`.
    #[inline]
    pub fn lcp(a: KeyType, b: KeyType, kmer_length: usize) -> usize {
        let mut res = 0;
        let mut mask = Self::CHAR_MASK << (Self::CHAR_WIDTH * kmer_length);
        let (a, b) = (Self::label(a), Self::label(b));

        while mask > 0 {
            mask >>= Self::CHAR_WIDTH;
            if mask == 0 || (a & mask) != (b & mask) {
                break;
            }
            res += 1;
        }
        res
    }
}

/// Graph position: node id in the high bits, offset in the low 10 bits.
pub struct Node;

impl Node {
    pub const OFFSET_BITS: usize = 10;
    pub const OFFSET_MASK: NodeType = 0x3FF;

    #[inline]
    pub fn encode(node_id: u64, node_offset: u64) -> NodeType {
        (node_id << Self::OFFSET_BITS) | node_offset
    }

    /// Parses an `id:offset` token.
    pub fn encode_token(token: &str) -> Result<NodeType> {
        let (id, offset) = token
            .split_once(':')
            .ok_or_else(|| ConstructionError::Parse(format!("expected id:offset, got '{}'", token)))?;
        let id = id
            .parse::<u64>()
            .map_err(|e| ConstructionError::Parse(format!("bad node id in '{}': {}", token, e)))?;
        let offset = offset
            .parse::<u64>()
            .map_err(|e| ConstructionError::Parse(format!("bad node offset in '{}': {}", token, e)))?;
        if offset > Self::OFFSET_MASK {
            return Err(ConstructionError::Parse(format!(
                "node offset {} in '{}' does not fit in {} bits",
                offset,
                token,
                Self::OFFSET_BITS
            )));
        }
        Ok(Self::encode(id, offset))
    }

    pub fn decode(node: NodeType) -> String {
        format!("{}:{}", Self::id(node), Self::offset(node))
    }

    #[inline]
    pub fn id(node: NodeType) -> u64 {
        node >> Self::OFFSET_BITS
    }

    #[inline]
    pub fn offset(node: NodeType) -> u64 {
        node & Self::OFFSET_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_fields() {
        let alpha = Alphabet::default();
        let key = Key::encode(&alpha, b"GAT", 0b0000_0110, 0b0001_0000);
        // G=3, A=1, T=4
        assert_eq!(Key::label(key), (3 << 6) | (1 << 3) | 4);
        assert_eq!(Key::predecessors(key), 0b0000_0110);
        assert_eq!(Key::successors(key), 0b0001_0000);
        assert_eq!(Key::last(key), 4);
        assert_eq!(Key::decode(key, 3, &alpha), "GAT");
    }

    #[test]
    fn test_key_merge_and_replace() {
        let alpha = Alphabet::default();
        let a = Key::encode(&alpha, b"AC", 0b01, 0b10);
        let b = Key::encode(&alpha, b"AC", 0b100, 0b1000);
        let merged = Key::merge(a, b);
        assert_eq!(Key::label(merged), Key::label(a));
        assert_eq!(Key::predecessors(merged), 0b101);
        assert_eq!(Key::successors(merged), 0b1010);

        let replaced = Key::replace(merged, 42);
        assert_eq!(Key::label(replaced), 42);
        assert_eq!(Key::predecessors(replaced), 0b101);
        assert_eq!(Key::successors(replaced), 0b1010);
    }

    #[test]
    fn test_key_lcp() {
        let alpha = Alphabet::default();
        let a = Key::encode(&alpha, b"GATT", 0, 0);
        let b = Key::encode(&alpha, b"GACA", 0, 0);
        let c = Key::encode(&alpha, b"TATT", 0, 0);
        assert_eq!(Key::lcp(a, b, 4), 2);
        assert_eq!(Key::lcp(a, c, 4), 0);
        assert_eq!(Key::lcp(a, a, 4), 4);
    }

    #[test]
    fn test_key_lcp_full_length() {
        let alpha = Alphabet::default();
        let a = Key::encode(&alpha, b"ACGTACGTACGTACGT", 0, 0);
        let b = Key::encode(&alpha, b"ACGTACGTACGTACGA", 0, 0);
        assert_eq!(Key::lcp(a, b, 16), 15);
        assert_eq!(Key::lcp(a, a, 16), 16);
    }

    #[test]
    fn test_node_tokens() {
        let node = Node::encode_token("1234:17").unwrap();
        assert_eq!(Node::id(node), 1234);
        assert_eq!(Node::offset(node), 17);
        assert_eq!(Node::decode(node), "1234:17");
        assert!(Node::encode_token("1234").is_err());
        assert!(Node::encode_token("x:1").is_err());
        assert!(Node::encode_token("1:1024").is_err());
    }
}
