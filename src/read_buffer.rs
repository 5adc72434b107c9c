// src/read_buffer.rs

// Buffered access to files of fixed-size records.

use bytemuck::Pod;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::mem;
use std::path::Path;

use crate::error::{ConstructionError, Result};

pub const MEGABYTE: usize = 1 << 20;

/// A buffer for reading a file of records mostly sequentially.
///
/// The buffer contains records `offset` to `offset + buffer.len() - 1`, and the
/// file cursor is always at record `offset + buffer.len()`. After `seek()`, the
/// buffer holds between `buffer_size / 2` and `buffer_size` records unless the
/// end of the file is closer.
pub struct ReadBuffer<T: Pod> {
    file: Option<File>,
    elements: usize,
    offset: usize,
    buffer: VecDeque<T>,
    buffer_size: usize,
}

impl<T: Pod> Default for ReadBuffer<T> {
    fn default() -> Self {
        Self::with_buffer_size(MEGABYTE)
    }
}

impl<T: Pod> ReadBuffer<T> {
    pub const RECORD_SIZE: usize = mem::size_of::<T>();

    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding at most `buffer_size` records (at least 2).
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        ReadBuffer {
            file: None,
            elements: 0,
            offset: 0,
            buffer: VecDeque::new(),
            buffer_size: buffer_size.max(2),
        }
    }

    /// Opens `path` with a buffer of `buffer_size` records.
    pub fn open<P: AsRef<Path>>(path: P, buffer_size: usize) -> Result<Self> {
        let mut buffer = Self::with_buffer_size(buffer_size);
        buffer.init(path)?;
        Ok(buffer)
    }

    /// Opens a new file, discarding the previous one. The record count is the
    /// file size divided by the record size.
    pub fn init<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.clear();
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ConstructionError::resource(path, e))?;
        self.elements = file.metadata()?.len() as usize / Self::RECORD_SIZE;
        self.offset = 0;
        self.file = Some(file);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.file = None;
        self.elements = 0;
        self.offset = 0;
    }

    /// Number of records in the file.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements == 0
    }

    /// Position of the first buffered record.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn buffered(&self, i: usize) -> bool {
        i >= self.offset && i < self.offset + self.buffer.len()
    }

    fn minimum_size(&self) -> usize {
        self.buffer_size / 2
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "ReadBuffer: no open file"))
    }

    /// Moves the window to start at record `i`. Does nothing if `i` is past the end.
    pub fn seek(&mut self, i: usize) -> io::Result<()> {
        if i >= self.len() {
            return Ok(());
        }

        if self.buffered(i) {
            let skip = i - self.offset;
            self.buffer.drain(..skip);
            self.offset = i;
            if self.buffer.len() < self.minimum_size() {
                self.fill()?;
            }
        } else {
            self.buffer.clear();
            let position = (i * Self::RECORD_SIZE) as u64;
            self.file()?.seek(SeekFrom::Start(position))?;
            self.offset = i;
            self.fill()?;
        }
        Ok(())
    }

    /// Reads records after the buffer until it holds `buffer_size` records or reaches the end.
    pub fn fill(&mut self) -> io::Result<()> {
        let target_size = self.buffer_size.min(self.len() - self.offset);
        if self.buffer.len() >= target_size {
            return Ok(());
        }

        let count = target_size - self.buffer.len();
        let mut temp = vec![T::zeroed(); count];
        self.file()?.read_exact(bytemuck::cast_slice_mut(&mut temp))?;
        self.buffer.extend(temp);
        Ok(())
    }

    /// Record `i`, moving the window if necessary.
    pub fn get(&mut self, i: usize) -> io::Result<T> {
        if i >= self.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("ReadBuffer: record {} out of {}", i, self.len()),
            ));
        }
        if !self.buffered(i) {
            self.seek(i)?;
        }
        Ok(self.buffer[i - self.offset])
    }

    /// Removes and returns the first buffered record, or `None` at the end of the file.
    pub fn pop(&mut self) -> io::Result<Option<T>> {
        if self.offset >= self.len() {
            return Ok(None);
        }
        if self.buffer.is_empty() {
            self.fill()?;
        }
        let element = self.buffer.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "ReadBuffer: buffer underrun")
        })?;
        self.offset += 1;
        Ok(Some(element))
    }
}

/// Writes records to a file without any header.
pub struct RecordWriter<T: Pod> {
    writer: BufWriter<File>,
    written: usize,
    _marker: PhantomData<T>,
}

impl<T: Pod> RecordWriter<T> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| ConstructionError::resource(path, e))?;
        Ok(RecordWriter {
            writer: BufWriter::new(file),
            written: 0,
            _marker: PhantomData,
        })
    }

    pub fn write(&mut self, record: &T) -> io::Result<()> {
        self.writer.write_all(bytemuck::bytes_of(record))?;
        self.written += 1;
        Ok(())
    }

    pub fn write_all(&mut self, records: &[T]) -> io::Result<()> {
        self.writer.write_all(bytemuck::cast_slice(records))?;
        self.written += records.len();
        Ok(())
    }

    /// Flushes the file and returns the number of records written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.written)
    }
}

pub fn write_records<T: Pod, P: AsRef<Path>>(path: P, records: &[T]) -> Result<()> {
    let mut writer = RecordWriter::create(path)?;
    writer.write_all(records)?;
    writer.finish()?;
    Ok(())
}

pub fn read_records<T: Pod, P: AsRef<Path>>(path: P) -> Result<Vec<T>> {
    let mut buffer = ReadBuffer::<T>::open(path, MEGABYTE)?;
    let mut records = Vec::with_capacity(buffer.len());
    while let Some(record) = buffer.pop()? {
        records.push(record);
    }
    Ok(records)
}
