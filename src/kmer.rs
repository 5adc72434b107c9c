// src/kmer.rs

// K-mer occurrences and their reduction to unique sorted labels.

use bytemuck::{Pod, Zeroable};
use log::{debug, info};
use rayon::prelude::*;
use simple_sds::int_vector::IntVector;
use simple_sds::ops::Access;
use std::cmp::Ordering;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::alphabet::Alphabet;
use crate::codec::{Key, KeyType, Node, NodeType};
use crate::error::{ConstructionError, Result};

/// A k-mer occurrence witnessing the path range `[from, to)` in the graph.
///
/// If `to` is the all-ones sentinel, the label is already unique and the path
/// will not be extended.
#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable, PartialEq, Eq, Debug)]
pub struct KMer {
    pub key: KeyType,
    pub from: NodeType,
    pub to: NodeType,
}

impl KMer {
    pub const SORTED: NodeType = !0;

    pub fn new(key: KeyType, from: NodeType, to: NodeType) -> Self {
        KMer { key, from, to }
    }

    /// Builds the occurrence for successor token `tokens[successor]` of a text record
    /// `label, from, predecessors, successors, to_1, ..., to_n`.
    pub fn from_tokens(tokens: &[&str], alpha: &Alphabet, successor: usize) -> Result<Self> {
        if tokens.len() < 5 || successor < 4 || successor >= tokens.len() {
            return Err(ConstructionError::Parse(format!(
                "record with {} fields has no successor field {}",
                tokens.len(),
                successor
            )));
        }
        if tokens[0].len() > Key::MAX_LENGTH {
            return Err(ConstructionError::Parse(format!(
                "k-mer '{}' is longer than {} characters",
                tokens[0],
                Key::MAX_LENGTH
            )));
        }

        let predecessors = Self::chars(tokens[2], alpha);
        let successors = Self::chars(tokens[3], alpha);
        Ok(KMer {
            key: Key::encode(alpha, tokens[0].as_bytes(), predecessors, successors),
            from: Node::encode_token(tokens[1])?,
            to: Node::encode_token(tokens[successor])?,
        })
    }

    /// Comp value set of a comma-separated symbol list such as `A,C,T`.
    pub fn chars(token: &str, alpha: &Alphabet) -> u8 {
        token
            .bytes()
            .step_by(2)
            .fold(0u8, |val, symbol| val | (1 << alpha.comp(symbol)))
    }

    #[inline]
    pub fn label(&self) -> KeyType {
        Key::label(self.key)
    }

    /// Order by label only; the predecessor and successor bits are ignored.
    #[inline]
    pub fn cmp_label(&self, another: &KMer) -> Ordering {
        self.label().cmp(&another.label())
    }

    #[inline]
    pub fn sorted(&self) -> bool {
        self.to == Self::SORTED
    }

    #[inline]
    pub fn make_sorted(&mut self) {
        self.to = Self::SORTED;
    }
}

impl fmt::Display for KMer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let to = if self.sorted() {
            String::from("sorted")
        } else {
            Node::decode(self.to)
        };
        write!(
            f,
            "({}, {:#04x}, {:#04x}, {} -> {})",
            self.label(),
            Key::predecessors(self.key),
            Key::successors(self.key),
            Node::decode(self.from),
            to
        )
    }
}

/// This function does several things:
///
/// 1. Sorts the k-mer array by the labels encoded in the keys (stable).
/// 2. Builds an array of unique labels, with the predecessor and successor
///    fields merged from the original k-mers.
/// 3. Stores the last character of each unique label in `last_char`.
/// 4. Replaces the labels in the k-mer keys by their ranks.
pub fn unique_keys(kmers: &mut [KMer]) -> (Vec<KeyType>, IntVector) {
    kmers.par_sort_by_key(|kmer| kmer.label());

    let mut keys: Vec<KeyType> = Vec::new();
    for kmer in kmers.iter_mut() {
        match keys.last_mut() {
            Some(last) if Key::label(*last) == kmer.label() => *last = Key::merge(*last, kmer.key),
            _ => keys.push(kmer.key),
        }
        kmer.key = Key::replace(kmer.key, (keys.len() - 1) as u64);
    }

    let mut last_char = IntVector::with_len(keys.len(), Key::CHAR_WIDTH, 0)
        .expect("character width is a valid integer width");
    for (i, &key) in keys.iter().enumerate() {
        last_char.set(i, Key::last(key) as u64);
    }

    debug!("{} k-mer occurrences, {} unique labels", kmers.len(), keys.len());
    (keys, last_char)
}

/// Reads a text k-mer file with one tab-separated record per line:
/// `label, from, predecessors, successors, to_1, ..., to_n`.
///
/// Every successor field yields one [`KMer`]. Returns the k-mers and the k-mer length.
pub fn read_text_kmers<P: AsRef<Path>>(path: P, alpha: &Alphabet) -> Result<(Vec<KMer>, usize)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ConstructionError::resource(path, e))?;
    let reader = BufReader::new(file);

    let mut kmers = Vec::new();
    let mut kmer_length = None;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split('\t').collect();
        if tokens.len() < 5 {
            return Err(ConstructionError::Parse(format!(
                "line {}: expected at least 5 fields, found {}",
                line_num + 1,
                tokens.len()
            )));
        }
        let length = tokens[0].len();
        match kmer_length {
            None => kmer_length = Some(length),
            Some(expected) if expected != length => {
                return Err(ConstructionError::Parse(format!(
                    "line {}: k-mer length {} differs from {}",
                    line_num + 1,
                    length,
                    expected
                )));
            }
            _ => {}
        }
        for successor in 4..tokens.len() {
            kmers.push(KMer::from_tokens(&tokens, alpha, successor)?);
        }
    }

    info!("Read {} k-mer occurrences from {}", kmers.len(), path.display());
    Ok((kmers, kmer_length.unwrap_or(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use simple_sds::ops::Vector;

    #[test]
    fn test_from_tokens() {
        let alpha = Alphabet::default();
        let tokens = ["GAT", "12:3", "A,C", "T", "12:6", "14:0"];
        let first = KMer::from_tokens(&tokens, &alpha, 4).unwrap();
        let second = KMer::from_tokens(&tokens, &alpha, 5).unwrap();

        assert_eq!(first.label(), second.label());
        assert_eq!(Key::predecessors(first.key), (1 << 1) | (1 << 2));
        assert_eq!(Key::successors(first.key), 1 << 4);
        assert_eq!(first.from, Node::encode(12, 3));
        assert_eq!(first.to, Node::encode(12, 6));
        assert_eq!(second.to, Node::encode(14, 0));
        assert!(KMer::from_tokens(&tokens, &alpha, 6).is_err());
    }

    #[test]
    fn test_sorted_flag() {
        let mut kmer = KMer::new(0, 1, 2);
        assert!(!kmer.sorted());
        kmer.make_sorted();
        assert!(kmer.sorted());
        assert!(kmer.to_string().contains("sorted"));
    }

    #[test]
    fn test_unique_keys_empty() {
        let mut kmers: Vec<KMer> = Vec::new();
        let (keys, last_char) = unique_keys(&mut kmers);
        assert!(keys.is_empty());
        assert_eq!(last_char.len(), 0);
    }

    #[test]
    fn test_unique_keys_merges_runs() {
        let alpha = Alphabet::default();
        let mut kmers = vec![
            KMer::new(Key::encode(&alpha, b"GA", 0b10, 0), 10, 11),
            KMer::new(Key::encode(&alpha, b"AC", 0, 0b100), 20, 21),
            KMer::new(Key::encode(&alpha, b"GA", 0b100, 0b10), 30, 31),
        ];
        let (keys, last_char) = unique_keys(&mut kmers);

        assert_eq!(keys.len(), 2);
        assert_eq!(Key::decode(keys[0], 2, &alpha), "AC");
        assert_eq!(Key::decode(keys[1], 2, &alpha), "GA");
        assert_eq!(Key::predecessors(keys[1]), 0b110);
        assert_eq!(Key::successors(keys[1]), 0b10);
        assert_eq!(last_char.get(0), 2);
        assert_eq!(last_char.get(1), 1);

        // Stable: the two GA occurrences keep their input order.
        let ranks: Vec<(u64, u64)> = kmers.iter().map(|k| (k.label(), k.from)).collect();
        assert_eq!(ranks, vec![(0, 20), (1, 10), (1, 30)]);
        assert_eq!(Key::predecessors(kmers[2].key), 0b100);
    }
}
