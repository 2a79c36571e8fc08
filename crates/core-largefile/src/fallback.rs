//! Bounded full read used when the policy selects full-content rendering.

use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::error::{LargeFileError, Result, open_regular};

pub const DEFAULT_FALLBACK_MAX_LINES: usize = 50_000;
/// Lines read between progress callbacks.
pub const PROGRESS_STRIDE: usize = 100;
/// Per-line bookkeeping overhead assumed by `estimate_memory_usage`.
pub const LINE_OVERHEAD_BYTES: u64 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadedLines {
    pub lines: Vec<String>,
    /// Stopped at `max_lines` before end of file.
    pub truncated: bool,
    pub bytes_read: u64,
}

/// Read up to `max_lines` lines into memory, reporting progress as the
/// fraction of file bytes consumed every `PROGRESS_STRIDE` lines and once at
/// the end.
pub fn read_lines_with_progress<F>(
    path: impl AsRef<Path>,
    max_lines: usize,
    mut on_progress: F,
    cancel: &CancelToken,
) -> Result<LoadedLines>
where
    F: FnMut(f32),
{
    let path = path.as_ref();
    let file = open_regular(path)?;
    let total = file
        .metadata()
        .map_err(|e| LargeFileError::from_io(path, e))?
        .len();
    let fraction = |read: u64| if total == 0 { 1.0 } else { read as f32 / total as f32 };

    let mut reader = BufReader::new(file);
    let mut out = LoadedLines::default();
    let mut buf = Vec::new();
    loop {
        if out.lines.len() == max_lines {
            out.truncated = !reader
                .fill_buf()
                .map_err(|e| LargeFileError::from_io(path, e))?
                .is_empty();
            break;
        }
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| LargeFileError::from_io(path, e))?;
        if n == 0 {
            break;
        }
        out.bytes_read += n as u64;
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        out.lines.push(String::from_utf8_lossy(raw).into_owned());
        if out.lines.len() % PROGRESS_STRIDE == 0 {
            cancel.check()?;
            on_progress(fraction(out.bytes_read));
        }
    }
    on_progress(fraction(out.bytes_read));

    if out.truncated {
        warn!(
            target: "largefile.fallback",
            file = %path.display(),
            max_lines,
            "full_read_truncated"
        );
    }
    debug!(
        target: "largefile.fallback",
        file = %path.display(),
        lines = out.lines.len(),
        bytes_read = out.bytes_read,
        "full_read_done"
    );
    Ok(out)
}

/// Rough resident size of `lines`: content bytes plus a fixed per-line overhead.
pub fn estimate_memory_usage<S: AsRef<str>>(lines: &[S]) -> u64 {
    lines
        .iter()
        .map(|l| l.as_ref().len() as u64 + LINE_OVERHEAD_BYTES)
        .sum()
}
