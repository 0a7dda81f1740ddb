use flate2::{Crc, Decompress, FlushDecompress, Status};

use crate::error::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const GZIP_DEFLATE: u8 = 8;
const GZIP_TRAILER_SIZE: usize = 8;

const FHCRC: u8 = 0x02;
const FEXTRA: u8 = 0x04;
const FNAME: u8 = 0x08;
const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xe0;

/// The maximum number of bytes handed to the inflater's output at once
const OUTPUT_STEP: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberState {
    Header,
    Body,
    Trailer,
    Finished,
}

/// An incremental decoder of a single gzip member.
///
/// Compressed chunks are handed over with [`GzipDecompressor::feed`] and expanded in bounded
/// steps with [`GzipDecompressor::decompress`]. Bytes that were fed but not expanded yet
/// (the rest of the chunk, a partial header or a partial trailer) form the residue.
/// The stream is finished once the trailer has been read and its CRC32 and size checked.
pub struct GzipDecompressor {
    inflate: Decompress,
    crc: Crc,
    state: MemberState,
    // the residue is `input[position..]`
    input: Vec<u8>,
    position: usize,
    ignored: usize,
}

impl std::fmt::Debug for GzipDecompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GzipDecompressor")
            .field("state", &self.state)
            .field("total_in", &self.inflate.total_in())
            .field("total_out", &self.inflate.total_out())
            .field("unconsumed", &self.unconsumed().len())
            .finish()
    }
}

impl Default for GzipDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl GzipDecompressor {
    /// Returns a new [`GzipDecompressor`] expecting the start of a gzip member.
    pub fn new() -> Self {
        Self {
            inflate: Decompress::new(false),
            crc: Crc::new(),
            state: MemberState::Header,
            input: vec![],
            position: 0,
            ignored: 0,
        }
    }

    /// Whether the end of the gzip member (including its trailer) was reached.
    pub fn is_finished(&self) -> bool {
        self.state == MemberState::Finished
    }

    /// The bytes fed to this decompressor that it did not consume yet.
    pub fn unconsumed(&self) -> &[u8] {
        &self.input[self.position..]
    }

    /// The number of decompressed bytes produced so far.
    pub fn total_out(&self) -> u64 {
        self.inflate.total_out()
    }

    /// Appends `chunk` to the input. The chunk becomes the input buffer, so it is not copied
    /// unless a residue has to be prepended to it.
    pub fn feed(&mut self, mut chunk: Vec<u8>) {
        if self.is_finished() {
            self.ignore(chunk.len());
            return;
        }
        let residue = &self.input[self.position..];
        if !residue.is_empty() {
            chunk.splice(..0, residue.iter().copied());
        }
        self.input = chunk;
        self.position = 0;
    }

    /// Returns an empty buffer to read the next chunk into: the input buffer when all of it
    /// was consumed, a new one otherwise.
    pub fn take_buffer(&mut self) -> Vec<u8> {
        if self.position < self.input.len() {
            return vec![];
        }
        self.position = 0;
        let mut buffer = std::mem::take(&mut self.input);
        buffer.clear();
        buffer
    }

    /// Decompresses the residue, appending at most `limit` bytes to `output`.
    /// Returns the number of bytes appended.
    ///
    /// Returns 0 iff the decompressor is finished or needs more input.
    pub fn decompress(&mut self, output: &mut Vec<u8>, limit: usize) -> Result<usize> {
        let initial_len = output.len();
        loop {
            let remaining = &self.input[self.position..];
            match self.state {
                MemberState::Header => match header_len(remaining)? {
                    Some(length) => {
                        self.position += length;
                        self.state = MemberState::Body;
                    }
                    None => break,
                },
                MemberState::Body => {
                    let available = limit.saturating_sub(output.len() - initial_len);
                    if available == 0 {
                        break;
                    }
                    let (read, status) =
                        inflate(&mut self.inflate, &mut self.crc, remaining, output, available)?;
                    self.position += read;
                    if status != Status::StreamEnd {
                        // either the limit was reached or the residue is exhausted
                        break;
                    }
                    self.state = MemberState::Trailer;
                }
                MemberState::Trailer => {
                    if remaining.len() < GZIP_TRAILER_SIZE {
                        break;
                    }
                    self.check_trailer(&remaining[..GZIP_TRAILER_SIZE])?;
                    self.position += GZIP_TRAILER_SIZE;
                    self.state = MemberState::Finished;
                }
                MemberState::Finished => break,
            }
        }

        if self.is_finished() {
            self.ignore(self.input.len() - self.position);
            self.input.clear();
            self.position = 0;
        }
        Ok(output.len() - initial_len)
    }

    fn check_trailer(&self, trailer: &[u8]) -> Result<()> {
        let crc = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
        let size = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
        if crc != self.crc.sum() {
            return Err(Error::decompression(format!(
                "CRC32 mismatch (expected {:#010x}, computed {:#010x})",
                crc,
                self.crc.sum()
            )));
        }
        if size != self.crc.amount() {
            return Err(Error::decompression(format!(
                "size mismatch (expected {} bytes, decompressed {})",
                size,
                self.crc.amount()
            )));
        }
        Ok(())
    }

    fn ignore(&mut self, length: usize) {
        if length == 0 {
            return;
        }
        if self.ignored == 0 {
            log::warn!(
                "Ignoring data after the end of the gzip stream ({} bytes so far)",
                length
            );
        }
        self.ignored += length;
    }
}

/// Runs the inflater over `input` until it needs more input, reaches the end of the deflate
/// stream or appended `limit` bytes to `output`.
/// Returns the number of input bytes consumed and the last status.
fn inflate(
    inflate: &mut Decompress,
    crc: &mut Crc,
    input: &[u8],
    output: &mut Vec<u8>,
    limit: usize,
) -> Result<(usize, Status)> {
    let mut read = 0;
    let mut written = 0;
    loop {
        let start = output.len();
        output.resize(start + OUTPUT_STEP.min(limit - written), 0);

        let before_in = inflate.total_in();
        let before_out = inflate.total_out();
        let status = inflate.decompress(&input[read..], &mut output[start..], FlushDecompress::None);
        let produced = (inflate.total_out() - before_out) as usize;
        output.truncate(start + produced);
        let status = status?;

        let consumed = (inflate.total_in() - before_in) as usize;
        read += consumed;
        written += produced;
        crc.update(&output[start..]);

        match status {
            Status::StreamEnd => return Ok((read, status)),
            _ if written == limit => return Ok((read, status)),
            // no progress: every byte was consumed and nothing is buffered in the inflater
            _ if consumed == 0 && produced == 0 => return Ok((read, status)),
            _ => {}
        }
    }
}

/// Returns the length of the gzip header at the start of `data`, or `None` if `data`
/// does not contain the complete header yet.
fn header_len(data: &[u8]) -> Result<Option<usize>> {
    if data.iter().zip(GZIP_MAGIC.iter()).any(|(a, b)| a != b) {
        return Err(Error::decompression("not a gzip stream (invalid magic bytes)"));
    }
    if data.len() >= 3 && data[2] != GZIP_DEFLATE {
        return Err(Error::decompression(format!(
            "unsupported compression method {}",
            data[2]
        )));
    }
    if data.len() < 10 {
        return Ok(None);
    }
    let flags = data[3];
    if flags & FRESERVED != 0 {
        return Err(Error::decompression("reserved header flags are set"));
    }

    let mut length = 10;
    if flags & FEXTRA != 0 {
        if data.len() < length + 2 {
            return Ok(None);
        }
        let extra = u16::from_le_bytes([data[length], data[length + 1]]) as usize;
        length += 2 + extra;
    }
    for flag in [FNAME, FCOMMENT] {
        if flags & flag != 0 {
            match data.get(length..).and_then(|x| x.iter().position(|&b| b == 0)) {
                Some(end) => length += end + 1,
                None => return Ok(None),
            }
        }
    }
    if flags & FHCRC != 0 {
        length += 2;
    }
    Ok((data.len() >= length).then(|| length))
}
