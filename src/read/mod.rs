mod header;
mod lines;
mod paginate;
#[cfg(feature = "async")]
mod stream;

use std::io::Read;

pub use header::HeaderSkipper;
pub use lines::{LineBuffer, LineReader};
pub use paginate::Paginator;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use stream::{get_line_stream, get_page_stream};

use crate::error::{Error, Result};
use crate::source::{ChunkSource, ReadChunkSource};
use crate::{DEFAULT_CHUNK_SIZE, DEFAULT_HEADER_LINES, DEFAULT_PAGE_SIZE, MIN_CHUNK_SIZE};

/// The [`Paginator`] returned by [`get_page_iterator`].
pub type PageIterator<S> = Paginator<HeaderSkipper<LineReader<S>>>;

/// Options to read an object into pages.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ReadOptions {
    /// The maximum number of compressed bytes read from the source at once
    pub chunk_size: usize,
    /// The number of lines at the start of the object that are discarded
    pub header_lines: usize,
    /// The number of lines per page
    pub page_size: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            header_lines: DEFAULT_HEADER_LINES,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ReadOptions {
    /// Returns the default [`ReadOptions`] overridden by the environment variables
    /// `CHUNK_SIZE_BYTES`, `HEADER_LINES` and `PAGE_SIZE`.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Returns the default [`ReadOptions`] overridden by the recognized `(key, value)` pairs.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in vars {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "CHUNK_SIZE_BYTES" => options.chunk_size = value.parse()?,
                "HEADER_LINES" => options.header_lines = value.parse()?,
                "PAGE_SIZE" => options.page_size = value.parse()?,
                _ => {}
            }
        }
        options.validate()?;
        Ok(options)
    }

    /// Checks that these options can be used to read an object.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfiguration(
                "the chunk size must be positive".to_string(),
            ));
        }
        if self.page_size == 0 {
            return Err(Error::InvalidConfiguration(
                "the page size must be positive".to_string(),
            ));
        }
        if self.chunk_size < MIN_CHUNK_SIZE {
            log::warn!(
                "A chunk size of {} bytes is inefficient; consider at least {} bytes",
                self.chunk_size,
                MIN_CHUNK_SIZE
            );
        }
        Ok(())
    }
}

/// Returns a new [`LineReader`] over the lines of the gzip-compressed object in `source`.
pub fn get_line_reader<S: ChunkSource>(source: S) -> LineReader<S> {
    LineReader::new(source)
}

/// Returns a [`PageIterator`] over the pages of the gzip-compressed object in `source`,
/// discarding its first `options.header_lines` lines.
///
/// No chunk is read until the first page is requested.
pub fn get_page_iterator<S: ChunkSource>(
    source: S,
    options: &ReadOptions,
) -> Result<PageIterator<S>> {
    options.validate()?;
    let lines = HeaderSkipper::new(get_line_reader(source), options.header_lines);
    Paginator::try_new(lines, options.page_size)
}

/// Returns a [`PageIterator`] over the pages of the gzip-compressed content of `reader`,
/// read in chunks of `options.chunk_size` bytes.
pub fn read_pages<R: Read>(
    reader: R,
    options: &ReadOptions,
) -> Result<PageIterator<ReadChunkSource<R>>> {
    options.validate()?;
    get_page_iterator(ReadChunkSource::new(reader, options.chunk_size), options)
}
