//! Sources of compressed chunks.
use std::io::Read;

use crate::error::{Error, Result};

/// A source of consecutive chunks of a compressed object.
pub trait ChunkSource {
    /// Clears `chunk` and fills it with the next chunk of the object.
    /// Returns `false` when the object has no more bytes (and `chunk` is left empty).
    ///
    /// An empty chunk is valid and does not mean the end of the object.
    fn read_chunk(&mut self, chunk: &mut Vec<u8>) -> Result<bool>;
}

/// Any iterator of chunks is a [`ChunkSource`].
impl<I: Iterator<Item = Result<Vec<u8>>>> ChunkSource for I {
    fn read_chunk(&mut self, chunk: &mut Vec<u8>) -> Result<bool> {
        chunk.clear();
        match self.next().transpose()? {
            Some(next) => {
                chunk.extend_from_slice(&next);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// A [`ChunkSource`] that reads chunks of at most `chunk_size` bytes from a [`Read`].
#[derive(Debug)]
pub struct ReadChunkSource<R: Read> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> ReadChunkSource<R> {
    /// Returns a new [`ReadChunkSource`].
    /// # Panics
    /// Panics iff `chunk_size` is zero.
    pub fn new(reader: R, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be positive");
        Self { reader, chunk_size }
    }

    /// Returns the inner reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ChunkSource for ReadChunkSource<R> {
    fn read_chunk(&mut self, chunk: &mut Vec<u8>) -> Result<bool> {
        chunk.clear();
        chunk.try_reserve(self.chunk_size).map_err(|e| {
            Error::SourceUnavailable(format!(
                "cannot allocate a chunk of {} bytes: {}",
                self.chunk_size, e
            ))
        })?;
        let read = self
            .reader
            .by_ref()
            .take(self.chunk_size as u64)
            .read_to_end(chunk)?;
        Ok(read > 0)
    }
}
