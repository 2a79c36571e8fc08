//! Line counting with a hard scan cap.
//!
//! Counts `\n` bytes. A trailing line without a terminator is not counted, so
//! `"a\nb"` reports 1. Callers that need "visible line" semantics add one
//! themselves when the file does not end in a newline.

use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{LargeFileError, Result, open_regular};

pub const DEFAULT_SCAN_CAP: u64 = 100_000;

const SCAN_BUFFER: usize = 64 * 1024;

/// Result of a (possibly capped) newline scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCount {
    pub count: u64,
    /// `true` when the scan stopped at the cap with bytes left unread; `count`
    /// is then a lower bound.
    pub capped: bool,
}

impl LineCount {
    pub fn exact(count: u64) -> Self {
        Self {
            count,
            capped: false,
        }
    }
}

/// Count newline bytes in `path`, stopping once `scan_cap` is reached.
pub fn count_lines(
    path: impl AsRef<Path>,
    scan_cap: u64,
    cancel: &CancelToken,
) -> Result<LineCount> {
    let path = path.as_ref();
    if scan_cap == 0 {
        return Err(LargeFileError::InvalidArgument(
            "scan cap must be positive".into(),
        ));
    }
    let file = open_regular(path)?;
    let mut reader = BufReader::with_capacity(SCAN_BUFFER, file);
    let mut count = 0u64;
    let mut capped = false;

    loop {
        cancel.check()?;
        let buf = reader
            .fill_buf()
            .map_err(|e| LargeFileError::from_io(path, e))?;
        if buf.is_empty() {
            break;
        }
        let len = buf.len();
        let mut stop_at = None;
        for (i, &byte) in buf.iter().enumerate() {
            if byte == b'\n' {
                count += 1;
                if count == scan_cap {
                    stop_at = Some(i + 1);
                    break;
                }
            }
        }
        match stop_at {
            Some(consumed) => {
                reader.consume(consumed);
                capped = consumed < len
                    || !reader
                        .fill_buf()
                        .map_err(|e| LargeFileError::from_io(path, e))?
                        .is_empty();
                break;
            }
            None => reader.consume(len),
        }
    }

    debug!(target: "largefile.index", file = %path.display(), count, capped, "line_count");
    Ok(LineCount { count, capped })
}
