//! Windowed line loading.
//!
//! Returns the lines in `[target - context, target + context]` (lower bound
//! saturating at zero) by scanning from the start of the file and stopping as
//! soon as the upper bound is passed. Lines before the window are skipped
//! without being decoded. Nothing is cached between calls, so a call costs
//! O(target + context) line reads.

use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::trace;

use crate::cancel::CancelToken;
use crate::error::{LargeFileError, Result, open_regular};

pub const DEFAULT_CONTEXT_LINES: usize = 100;

const SCAN_BUFFER: usize = 64 * 1024;
/// Lines scanned between cancellation checks.
const CANCEL_STRIDE: usize = 1024;

/// A contiguous run of file lines around an anchor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineWindow {
    pub lines: Vec<String>,
    /// The line the caller asked for. May lie outside `lines`.
    pub anchor_line: usize,
    /// 0-based index of `lines[0]` (the clamped lower bound).
    pub first_line: usize,
    /// Number of lines in the file, known when the scan hit end of file
    /// before passing the upper bound.
    pub total_lines: Option<usize>,
}

impl LineWindow {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The scan hit end of file before the upper bound.
    pub fn reached_eof(&self) -> bool {
        self.total_lines.is_some()
    }

    /// One past the last materialized line index.
    pub fn end_line(&self) -> usize {
        self.first_line + self.lines.len()
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.first_line && line < self.end_line()
    }

    pub fn get(&self, line: usize) -> Option<&str> {
        if !self.contains(line) {
            return None;
        }
        self.lines.get(line - self.first_line).map(String::as_str)
    }

    /// Lines paired with their 0-based file line numbers.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, l)| (self.first_line + i, l.as_str()))
    }
}

/// Load the lines within `context_lines` of `target_line`.
pub fn load_window(
    path: impl AsRef<Path>,
    target_line: usize,
    context_lines: usize,
    cancel: &CancelToken,
) -> Result<LineWindow> {
    let path = path.as_ref();
    let lo = target_line.saturating_sub(context_lines);
    let hi = target_line.saturating_add(context_lines);
    let (lines, total_lines) = scan_lines(path, lo, hi, cancel)?;
    trace!(
        target: "largefile.window",
        file = %path.display(),
        target_line,
        context_lines,
        first_line = lo,
        loaded = lines.len(),
        total_lines,
        "window_loaded"
    );
    Ok(LineWindow {
        lines,
        anchor_line: target_line,
        first_line: lo,
        total_lines,
    })
}

/// Load `line_count` lines starting at `start_line`.
pub fn load_range(
    path: impl AsRef<Path>,
    start_line: usize,
    line_count: usize,
    cancel: &CancelToken,
) -> Result<LineWindow> {
    let path = path.as_ref();
    if line_count == 0 {
        open_regular(path)?;
        return Ok(LineWindow {
            anchor_line: start_line,
            first_line: start_line,
            ..LineWindow::default()
        });
    }
    let hi = start_line.saturating_add(line_count - 1);
    let (lines, total_lines) = scan_lines(path, start_line, hi, cancel)?;
    Ok(LineWindow {
        lines,
        anchor_line: start_line,
        first_line: start_line,
        total_lines,
    })
}

/// Collect lines `lo..=hi`. Returns the lines and, when EOF came first, the
/// file's line count.
fn scan_lines(
    path: &Path,
    lo: usize,
    hi: usize,
    cancel: &CancelToken,
) -> Result<(Vec<String>, Option<usize>)> {
    let file = open_regular(path)?;
    let mut reader = BufReader::with_capacity(SCAN_BUFFER, file);
    let mut lines = Vec::with_capacity((hi - lo).saturating_add(1).min(4096));
    let mut buf = Vec::new();
    let mut index = 0usize;
    let io_err = |e: std::io::Error| LargeFileError::from_io(path, e);

    loop {
        if index > hi {
            return Ok((lines, None));
        }
        if index % CANCEL_STRIDE == 0 {
            cancel.check()?;
        }
        if index < lo {
            if reader.skip_until(b'\n').map_err(io_err)? == 0 {
                return Ok((lines, Some(index)));
            }
        } else {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).map_err(io_err)? == 0 {
                return Ok((lines, Some(index)));
            }
            lines.push(decode_line(&buf));
        }
        index += 1;
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
