use async_stream::try_stream;
use futures::{pin_mut, AsyncRead, AsyncReadExt, Stream, StreamExt};

use crate::compression::GzipDecompressor;
use crate::error::{Error, Result};
use crate::page::Page;
use crate::DECOMPRESSED_STEP;

use super::{LineBuffer, ReadOptions};

/// Returns a stream of the lines of the gzip-compressed content of `reader`,
/// read in chunks of at most `chunk_size` bytes.
pub fn get_line_stream<R: AsyncRead + Unpin + Send>(
    mut reader: R,
    chunk_size: usize,
) -> impl Stream<Item = Result<String>> {
    let mut decompressor = GzipDecompressor::new();
    let mut lines = LineBuffer::default();
    try_stream! {
        loop {
            let finished = decompressor.is_finished();
            if let Some(line) = lines.next_line(finished)? {
                yield line;
                continue;
            }
            if finished {
                break;
            }

            let decompressed = decompressor.decompress(lines.buffer_mut(), DECOMPRESSED_STEP)?;
            if decompressed > 0 || decompressor.is_finished() {
                continue;
            }

            let mut chunk = decompressor.take_buffer();
            let read = (&mut reader)
                .take(chunk_size as u64)
                .read_to_end(&mut chunk)
                .await?;
            if read == 0 {
                Err::<(), _>(Error::decompression(format!(
                    "the stream ended before the end of the gzip member ({} bytes decompressed)",
                    decompressor.total_out()
                )))?;
            }
            decompressor.feed(chunk);
        }
    }
}

/// Returns a stream of the [`Page`]s of the gzip-compressed content of `reader`,
/// discarding its first `options.header_lines` lines.
pub fn get_page_stream<R: AsyncRead + Unpin + Send>(
    reader: R,
    options: &ReadOptions,
) -> Result<impl Stream<Item = Result<Page>>> {
    options.validate()?;
    let ReadOptions {
        chunk_size,
        header_lines,
        page_size,
    } = *options;
    let lines = get_line_stream(reader, chunk_size);

    Ok(try_stream! {
        pin_mut!(lines);

        let mut skipped = 0;
        while skipped < header_lines {
            match lines.next().await {
                Some(line) => {
                    line?;
                    skipped += 1;
                }
                None => Err::<(), _>(Error::UnexpectedEndOfStream {
                    expected: header_lines,
                    found: skipped,
                })?,
            }
        }

        let mut number = 0;
        let mut offset = 0;
        loop {
            let mut page = vec![];
            while page.len() < page_size {
                match lines.next().await {
                    Some(line) => page.push(line?),
                    None => break,
                }
            }
            let length = page.len();
            if length == 0 {
                break;
            }
            yield Page::new(page, number, offset);
            number += 1;
            offset += length;
            if length < page_size {
                break;
            }
        }
    })
}
