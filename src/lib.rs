#![forbid(unsafe_code)]
//! Streams gzip-compressed, line-oriented objects into pages of lines without
//! holding the (decompressed) object in memory or on disk.
//!
//! The pipeline is pull-based: a [`source::ChunkSource`] yields compressed chunks,
//! a [`read::LineReader`] decompresses them and reassembles lines across chunk boundaries,
//! a [`read::HeaderSkipper`] discards the header lines and a [`read::Paginator`] groups
//! the remaining lines in [`page::Page`]s. [`driver`] wires them to a [`driver::Sink`].
pub mod compression;
pub mod driver;
pub mod error;
pub mod page;
pub mod read;
pub mod source;

pub use read::ReadOptions;
pub use streaming_decompression::fallible_streaming_iterator;
pub use streaming_decompression::FallibleStreamingIterator;

/// The default number of compressed bytes read from the source at once (8 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;
/// The default number of header lines discarded from the start of an object
pub const DEFAULT_HEADER_LINES: usize = 2;
/// The default number of lines per page
pub const DEFAULT_PAGE_SIZE: usize = 1000;
/// Chunk sizes below this are valid but inefficient
const MIN_CHUNK_SIZE: usize = 1024;
/// The maximum number of bytes decompressed before lines are split again
const DECOMPRESSED_STEP: usize = 64 * 1024;
