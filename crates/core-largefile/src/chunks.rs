//! Chunked file reader.
//!
//! Streams a file as a finite, ordered sequence of decoded text chunks without
//! holding more than one chunk (plus at most three carried bytes) in memory.
//!
//! Invariants:
//! * Chunks are yielded in strictly increasing `offset` order and their byte
//!   ranges `[offset, offset + len)` tile the file with no gaps.
//! * The sequence ends after the first read that returns fewer bytes than the
//!   chunk size. The descriptor is closed at that point.
//! * A UTF-8 sequence split by a chunk boundary is carried into the next chunk;
//!   only the final chunk decodes an incomplete tail lossily.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::error::{LargeFileError, Result, open_regular};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// File offset of the first byte decoded into `text`.
    pub offset: u64,
    /// Number of file bytes decoded into `text`.
    pub len: usize,
    pub text: String,
}

#[derive(Debug)]
pub struct ChunkReader {
    path: PathBuf,
    file: Option<File>,
    chunk_size: usize,
    offset: u64,
    carry: Vec<u8>,
    cancel: Option<CancelToken>,
    produced: usize,
}

impl ChunkReader {
    /// Open `path` for chunked reading. Each call starts an independent read
    /// at offset zero.
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if chunk_size == 0 {
            return Err(LargeFileError::InvalidArgument(
                "chunk size must be positive".into(),
            ));
        }
        let file = open_regular(path)?;
        debug!(target: "largefile.chunks", file = %path.display(), chunk_size, "chunk_reader_open");
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            chunk_size,
            offset: 0,
            carry: Vec::new(),
            cancel: None,
            produced: 0,
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn finish(&mut self) {
        if self.file.take().is_some() {
            debug!(
                target: "largefile.chunks",
                file = %self.path.display(),
                chunks = self.produced,
                bytes = self.offset,
                "chunk_reader_done"
            );
        }
    }

    /// Read until `chunk_size` bytes are appended to `buf` or EOF. Returns the
    /// number of bytes read.
    fn fill(file: &mut File, buf: &mut Vec<u8>, chunk_size: usize) -> io::Result<usize> {
        let start = buf.len();
        buf.resize(start + chunk_size, 0);
        let mut filled = 0;
        while filled < chunk_size {
            match file.read(&mut buf[start + filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    buf.truncate(start);
                    return Err(e);
                }
            }
        }
        buf.truncate(start + filled);
        Ok(filled)
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let file = self.file.as_mut()?;
            if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                debug!(target: "largefile.chunks", offset = self.offset, "chunk_reader_cancelled");
                self.file = None;
                return Some(Err(LargeFileError::Cancelled));
            }

            let mut buf = std::mem::take(&mut self.carry);
            let read = match Self::fill(file, &mut buf, self.chunk_size) {
                Ok(n) => n,
                Err(e) => {
                    self.file = None;
                    return Some(Err(LargeFileError::from_io(&self.path, e)));
                }
            };
            let last = read < self.chunk_size;
            if last {
                self.finish();
            }
            if buf.is_empty() {
                return None;
            }

            let keep = if last { 0 } else { incomplete_tail_len(&buf) };
            self.carry = buf.split_off(buf.len() - keep);
            if buf.is_empty() {
                // Chunk size smaller than one encoded char: keep accumulating.
                continue;
            }

            let len = buf.len();
            let text = match String::from_utf8(buf) {
                Ok(s) => s,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };
            let chunk = Chunk {
                offset: self.offset,
                len,
                text,
            };
            self.offset += len as u64;
            self.produced += 1;
            trace!(target: "largefile.chunks", offset = chunk.offset, len, "chunk");
            return Some(Ok(chunk));
        }
    }
}

/// Length of an incomplete UTF-8 sequence at the end of `bytes` (0..=3).
fn incomplete_tail_len(bytes: &[u8]) -> usize {
    let start = bytes.len().saturating_sub(3);
    for i in (start..bytes.len()).rev() {
        if bytes[i] & 0xC0 != 0x80 {
            return match std::str::from_utf8(&bytes[i..]) {
                Err(e) if e.error_len().is_none() => bytes.len() - i,
                _ => 0,
            };
        }
    }
    0
}
