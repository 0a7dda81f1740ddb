use std::io::{Error, ErrorKind, Result};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{future::BoxFuture, io::AsyncRead, Future};
use s3::Bucket;

/// An [`AsyncRead`] over an S3 object that fetches it sequentially with ranged GET requests
/// of at least `min_request_size` bytes.
pub struct RangedStreamer {
    pos: u64,
    length: u64, // total size
    state: State,
    path: String,
    min_request_size: usize, // requests have at least this size
}

impl RangedStreamer {
    pub fn new(length: u64, bucket: Bucket, path: String, min_request_size: usize) -> Self {
        Self {
            pos: 0,
            length,
            state: State::HasChunk(Chunk {
                start: 0,
                bucket,
                data: vec![],
            }),
            path,
            min_request_size,
        }
    }
}

async fn read_s3(start: u64, length: usize, bucket: Bucket, path: String) -> Result<Chunk> {
    let (mut data, code) = bucket
        .get_object_range(&path, start, Some(start + length as u64 - 1))
        .await
        .map_err(|x| Error::new(ErrorKind::Other, x.to_string()))?;
    if !(200..300).contains(&code) {
        return Err(Error::new(
            ErrorKind::Other,
            format!("GET {} (bytes {}..) returned status {}", path, start, code),
        ));
    }
    if data.is_empty() {
        return Err(Error::new(
            ErrorKind::UnexpectedEof,
            format!("GET {} (bytes {}..) returned no data", path, start),
        ));
    }
    log::debug!("Fetched {} bytes of {} at offset {}", data.len(), path, start);

    data.truncate(length);
    Ok(Chunk {
        start,
        bucket,
        data,
    })
}

enum State {
    HasChunk(Chunk),
    Fetching(BoxFuture<'static, Result<Chunk>>),
}

struct Chunk {
    start: u64,
    bucket: Bucket,
    data: Vec<u8>,
}

impl Chunk {
    /// The bytes of this chunk from the object's offset `pos` onwards, if it contains `pos`.
    fn remaining_from(&self, pos: u64) -> Option<&[u8]> {
        let end = self.start + self.data.len() as u64;
        (pos >= self.start && pos < end).then(|| &self.data[(pos - self.start) as usize..])
    }
}

impl AsyncRead for RangedStreamer {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<Result<usize>> {
        let this = self.get_mut();
        loop {
            if this.pos >= this.length || buf.is_empty() {
                return Poll::Ready(Ok(0));
            }
            match &mut this.state {
                State::HasChunk(chunk) => {
                    if let Some(available) = chunk.remaining_from(this.pos) {
                        let read = std::cmp::min(available.len(), buf.len());
                        buf[..read].copy_from_slice(&available[..read]);
                        this.pos += read as u64;
                        return Poll::Ready(Ok(read));
                    }
                    let remaining = (this.length - this.pos) as usize;
                    let length = std::cmp::max(this.min_request_size, buf.len()).min(remaining);
                    let future = read_s3(this.pos, length, chunk.bucket.clone(), this.path.clone());
                    this.state = State::Fetching(Box::pin(future));
                }
                State::Fetching(future) => match future.as_mut().poll(cx) {
                    Poll::Ready(Ok(chunk)) => this.state = State::HasChunk(chunk),
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Pending => return Poll::Pending,
                },
            }
        }
    }
}
