// src/alphabet.rs

// Mapping between raw symbols and the dense comp values used in keys.

use byteorder::{LittleEndian as LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Number of possible byte symbols.
pub const MAX_SIGMA: usize = 256;

/// Comp values of the default alphabet, in order.
pub const DEFAULT_COMP2CHAR: &[u8] = b"$ACGTN";

/// Default symbol mapping: `$` and `\0` are the terminator (comp 0), `ACGT` in
/// either case get 1..=4, everything else collapses to `N` (comp 5).
pub fn default_char2comp() -> Vec<u8> {
    let mut char2comp = vec![5u8; MAX_SIGMA];
    char2comp[0] = 0;
    char2comp[b'$' as usize] = 0;
    for (comp, (upper, lower)) in [(b'A', b'a'), (b'C', b'c'), (b'G', b'g'), (b'T', b't')]
        .into_iter()
        .enumerate()
    {
        char2comp[upper as usize] = comp as u8 + 1;
        char2comp[lower as usize] = comp as u8 + 1;
    }
    char2comp
}

/// Counts the occurrences of each comp value in `sequence`.
///
/// `counts` is overwritten. Symbols mapping outside `counts` are the caller's
/// responsibility and will panic.
pub fn character_counts(sequence: &[u8], char2comp: &[u8], counts: &mut [u64]) {
    counts.iter_mut().for_each(|c| *c = 0);
    for &symbol in sequence {
        counts[char2comp[symbol as usize] as usize] += 1;
    }
}

/// Alphabet with cumulative comp counts.
///
/// Comp order does not have to follow symbol order, as long as the terminator
/// is comp 0. `c[comp]` is the number of symbols with a smaller comp value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alphabet {
    pub char2comp: Vec<u8>,
    pub comp2char: Vec<u8>,
    pub c: Vec<u64>,
    pub sigma: usize,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::with_mapping(default_char2comp(), DEFAULT_COMP2CHAR.to_vec())
    }
}

impl Alphabet {
    /// Empty alphabet over the given mapping. All cumulative counts are 0.
    pub fn with_mapping(char2comp: Vec<u8>, comp2char: Vec<u8>) -> Self {
        debug_assert_eq!(char2comp.len(), MAX_SIGMA);
        let sigma = comp2char.len();
        Alphabet {
            char2comp,
            comp2char,
            c: vec![0; sigma + 1],
            sigma,
        }
    }

    /// Builds the alphabet from a sequence using the default mapping.
    pub fn from_sequence(sequence: &[u8]) -> Self {
        Self::from_sequence_with(sequence, default_char2comp(), DEFAULT_COMP2CHAR.to_vec())
    }

    pub fn from_sequence_with(sequence: &[u8], char2comp: Vec<u8>, comp2char: Vec<u8>) -> Self {
        let mut alpha = Self::with_mapping(char2comp, comp2char);
        if sequence.is_empty() {
            return alpha;
        }

        character_counts(sequence, &alpha.char2comp, &mut alpha.c);
        let mut sum = 0;
        for value in alpha.c.iter_mut() {
            let temp = *value;
            *value = sum;
            sum += temp;
        }
        alpha
    }

    /// Builds the alphabet from per-comp counts using the default mapping.
    pub fn from_counts(counts: &[u64]) -> Self {
        Self::from_counts_with(counts, default_char2comp(), DEFAULT_COMP2CHAR.to_vec())
    }

    /// Counts beyond `sigma` are ignored.
    pub fn from_counts_with(counts: &[u64], char2comp: Vec<u8>, comp2char: Vec<u8>) -> Self {
        let mut alpha = Self::with_mapping(char2comp, comp2char);
        for (i, &count) in counts.iter().take(alpha.sigma).enumerate() {
            alpha.c[i + 1] = alpha.c[i] + count;
        }
        for i in counts.len().min(alpha.sigma)..alpha.sigma {
            alpha.c[i + 1] = alpha.c[i];
        }
        alpha
    }

    /// Comp value of a raw symbol.
    #[inline]
    pub fn comp(&self, symbol: u8) -> u8 {
        self.char2comp[symbol as usize]
    }

    /// Raw symbol for a comp value.
    #[inline]
    pub fn symbol(&self, comp: u8) -> u8 {
        self.comp2char[comp as usize]
    }

    /// Writes `char2comp` (256 bytes), `sigma` (u64), `comp2char` (sigma bytes)
    /// and `c` (sigma + 1 u64 values). Returns the number of bytes written.
    pub fn serialize<W: Write>(&self, out: &mut W) -> io::Result<usize> {
        out.write_all(&self.char2comp)?;
        out.write_u64::<LE>(self.sigma as u64)?;
        out.write_all(&self.comp2char)?;
        for &value in self.c.iter() {
            out.write_u64::<LE>(value)?;
        }
        Ok(MAX_SIGMA + 8 + self.sigma + 8 * self.c.len())
    }

    pub fn load<R: Read>(input: &mut R) -> io::Result<Self> {
        let mut char2comp = vec![0u8; MAX_SIGMA];
        input.read_exact(&mut char2comp)?;
        let sigma = input.read_u64::<LE>()? as usize;
        if sigma > MAX_SIGMA {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("alphabet size {} exceeds {}", sigma, MAX_SIGMA),
            ));
        }
        let mut comp2char = vec![0u8; sigma];
        input.read_exact(&mut comp2char)?;
        let mut c = Vec::with_capacity(sigma + 1);
        for _ in 0..=sigma {
            c.push(input.read_u64::<LE>()?);
        }
        Ok(Alphabet {
            char2comp,
            comp2char,
            c,
            sigma,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_counts_from_sequence() {
        let alpha = Alphabet::from_sequence(b"GATTACA$");
        assert_eq!(alpha.sigma, 6);
        // $ A C G T N
        assert_eq!(alpha.c, vec![0, 1, 4, 5, 6, 8, 8]);
    }

    #[test]
    fn test_empty_sequence() {
        let alpha = Alphabet::from_sequence(b"");
        assert_eq!(alpha.c, vec![0; 7]);
        assert_eq!(alpha, Alphabet::default());
    }

    #[test]
    fn test_from_counts_matches_sequence() {
        let from_seq = Alphabet::from_sequence(b"acgtnNA$");
        let from_counts = Alphabet::from_counts(&[1, 2, 1, 1, 1, 2]);
        assert_eq!(from_seq, from_counts);
    }

    #[test]
    fn test_short_counts_vector() {
        let alpha = Alphabet::from_counts(&[1, 2]);
        assert_eq!(alpha.c, vec![0, 1, 3, 3, 3, 3, 3]);
    }

    #[test]
    fn test_serialize_load() {
        let alpha = Alphabet::from_sequence(b"CAT$GAT$");
        let mut buffer = Vec::new();
        let bytes = alpha.serialize(&mut buffer).unwrap();
        assert_eq!(bytes, buffer.len());
        let loaded = Alphabet::load(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(loaded, alpha);
    }
}
