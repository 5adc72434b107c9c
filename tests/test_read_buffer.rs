// tests/test_read_buffer.rs

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs;
use std::io::Write;
use tempfile::NamedTempFile;

use gcsa_doubling::path_node::PathNode;
use gcsa_doubling::read_buffer::{read_records, write_records, ReadBuffer};
use gcsa_doubling::{ConstructionError, KMer};

const RECORDS: u64 = 1000;

fn record_file() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let values: Vec<u64> = (0..RECORDS).map(|i| i * 3 + 1).collect();
    write_records(file.path(), &values).unwrap();
    file
}

#[test]
fn test_sequential_pop() {
    let file = record_file();
    let mut buffer = ReadBuffer::<u64>::open(file.path(), 16).unwrap();
    assert_eq!(buffer.len(), RECORDS as usize);

    let mut seen = Vec::new();
    while let Some(value) = buffer.pop().unwrap() {
        seen.push(value);
    }
    let expected: Vec<u64> = (0..RECORDS).map(|i| i * 3 + 1).collect();
    assert_eq!(seen, expected);
    assert_eq!(buffer.pop().unwrap(), None);
}

#[test]
fn test_random_access() {
    let file = record_file();
    let mut buffer = ReadBuffer::<u64>::open(file.path(), 32).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..500 {
        let i = rng.gen_range(0..RECORDS as usize);
        assert_eq!(buffer.get(i).unwrap(), i as u64 * 3 + 1, "record {}", i);
    }

    // Moving forward inside the window keeps the following records buffered.
    buffer.seek(100).unwrap();
    assert!(buffer.buffered(100));
    buffer.seek(110).unwrap();
    assert_eq!(buffer.offset(), 110);
    assert!(buffer.buffered(125));
    assert_eq!(buffer.get(125).unwrap(), 376);
}

#[test]
fn test_near_end() {
    let file = record_file();
    let mut buffer = ReadBuffer::<u64>::open(file.path(), 64).unwrap();
    let last = RECORDS as usize - 1;

    buffer.seek(last - 2).unwrap();
    assert!(buffer.buffered(last));
    assert!(!buffer.buffered(last + 1));
    assert_eq!(buffer.pop().unwrap(), Some((last as u64 - 2) * 3 + 1));
    assert_eq!(buffer.pop().unwrap(), Some((last as u64 - 1) * 3 + 1));
    assert_eq!(buffer.pop().unwrap(), Some(last as u64 * 3 + 1));
    assert_eq!(buffer.pop().unwrap(), None);

    // Seeking past the end does nothing; reading past the end is an error.
    buffer.seek(RECORDS as usize + 10).unwrap();
    assert!(buffer.get(RECORDS as usize).is_err());
}

#[test]
fn test_partial_record_and_empty_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&5u64.to_le_bytes()).unwrap();
    file.write_all(&[1, 2, 3]).unwrap();
    file.flush().unwrap();
    let mut buffer = ReadBuffer::<u64>::open(file.path(), 4).unwrap();
    assert_eq!(buffer.len(), 1);
    assert_eq!(buffer.pop().unwrap(), Some(5));
    assert_eq!(buffer.pop().unwrap(), None);

    let empty = NamedTempFile::new().unwrap();
    let mut buffer = ReadBuffer::<u64>::open(empty.path(), 4).unwrap();
    assert!(buffer.is_empty());
    assert_eq!(buffer.pop().unwrap(), None);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.bin");
    match ReadBuffer::<u64>::open(&path, 4) {
        Err(ConstructionError::Resource { path: reported, .. }) => assert_eq!(reported, path),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("opened a missing file"),
    }
}

#[test]
fn test_record_types() {
    let file = NamedTempFile::new().unwrap();
    let kmers: Vec<KMer> = (0..10).map(|i| KMer::new(i << 16, i, i + 1)).collect();
    write_records(file.path(), &kmers).unwrap();
    assert_eq!(fs::metadata(file.path()).unwrap().len(), 10 * 24);
    assert_eq!(read_records::<KMer, _>(file.path()).unwrap(), kmers);

    let nodes: Vec<PathNode> = kmers.iter().map(PathNode::from_kmer).collect();
    write_records(file.path(), &nodes).unwrap();
    let loaded: Vec<PathNode> = read_records(file.path()).unwrap();
    assert_eq!(loaded, nodes);
    assert_eq!(loaded[3].first_label[0], 3);
}
