use crate::compression::GzipDecompressor;
use crate::error::{Error, Result};
use crate::source::ChunkSource;
use crate::DECOMPRESSED_STEP;

/// Decompressed bytes that were not yet split into lines.
///
/// Bytes before `offset` were already returned as lines; the bytes after it form the
/// leftover: a line fragment waiting for its terminator.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: Vec<u8>,
    offset: usize,
    // no `\n` exists in `buffer[offset..searched]`
    searched: usize,
    lines: usize,
}

impl LineBuffer {
    /// The buffer new decompressed bytes should be appended to.
    /// Bytes of lines already returned are discarded first.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        if self.offset > 0 {
            self.buffer.drain(..self.offset);
            self.searched -= self.offset;
            self.offset = 0;
        }
        &mut self.buffer
    }

    /// The current line fragment.
    pub fn leftover(&self) -> &[u8] {
        &self.buffer[self.offset..]
    }

    /// The number of lines returned so far.
    pub fn lines_read(&self) -> usize {
        self.lines
    }

    /// The number of decompressed bytes held, including those of lines already returned.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns the next complete line, if any.
    ///
    /// When `finished` is true no more bytes will be appended and the leftover (if not empty)
    /// is returned as the last line.
    pub fn next_line(&mut self, finished: bool) -> Result<Option<String>> {
        let start = self.offset;
        let end = match self.buffer[self.searched..].iter().position(|&b| b == b'\n') {
            Some(position) => {
                let end = self.searched + position;
                self.offset = end + 1;
                // `\r\n` is a single terminator
                if end > start && self.buffer[end - 1] == b'\r' {
                    end - 1
                } else {
                    end
                }
            }
            None if finished && start < self.buffer.len() => {
                self.offset = self.buffer.len();
                self.buffer.len()
            }
            None => {
                self.searched = self.buffer.len();
                return Ok(None);
            }
        };
        self.searched = self.offset;
        self.lines += 1;

        std::str::from_utf8(&self.buffer[start..end])
            .map(|line| Some(line.to_string()))
            .map_err(|e| Error::Encoding {
                line: self.lines,
                message: e.to_string(),
            })
    }
}

/// An [`Iterator`] of the lines of a gzip-compressed object read from a [`ChunkSource`].
///
/// Chunks are pulled from the source only when the lines decompressed so far are exhausted,
/// and a chunk is decompressed in bounded steps as its lines are consumed. At any point it holds
/// a single chunk, the decompressor's state and one step of decompressed bytes.
/// After the first error, it returns `None`.
#[derive(Debug)]
pub struct LineReader<S: ChunkSource> {
    source: S,
    decompressor: GzipDecompressor,
    lines: LineBuffer,
    chunks: usize,
    finished: bool,
}

impl<S: ChunkSource> LineReader<S> {
    /// Returns a new [`LineReader`].
    pub fn new(source: S) -> Self {
        Self {
            source,
            decompressor: GzipDecompressor::new(),
            lines: LineBuffer::default(),
            chunks: 0,
            finished: false,
        }
    }

    /// The number of lines returned so far
    pub fn lines_read(&self) -> usize {
        self.lines.lines_read()
    }

    /// The number of chunks pulled from the source so far
    pub fn chunks_read(&self) -> usize {
        self.chunks
    }

    /// The number of decompressed bytes held
    pub fn buffered(&self) -> usize {
        self.lines.buffered()
    }

    /// Returns the source
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: ChunkSource> Iterator for LineReader<S> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let maybe_line = next_line(self).transpose();
        if !matches!(maybe_line, Some(Ok(_))) {
            self.finished = true;
        }
        maybe_line
    }
}

fn next_line<S: ChunkSource>(reader: &mut LineReader<S>) -> Result<Option<String>> {
    loop {
        let finished = reader.decompressor.is_finished();
        if let Some(line) = reader.lines.next_line(finished)? {
            return Ok(Some(line));
        }
        if finished {
            log::debug!(
                "Finished reading {} lines from {} chunks",
                reader.lines.lines_read(),
                reader.chunks
            );
            return Ok(None);
        }

        // the residue of the current chunk goes first
        let decompressed = reader
            .decompressor
            .decompress(reader.lines.buffer_mut(), DECOMPRESSED_STEP)?;
        if decompressed > 0 || reader.decompressor.is_finished() {
            continue;
        }

        let mut chunk = reader.decompressor.take_buffer();
        if !reader.source.read_chunk(&mut chunk)? {
            return Err(Error::decompression(format!(
                "the stream ended before the end of the gzip member ({} bytes decompressed)",
                reader.decompressor.total_out()
            )));
        }
        reader.chunks += 1;
        log::debug!("Chunk {} ({} bytes) read", reader.chunks, chunk.len());
        reader.decompressor.feed(chunk);
    }
}
