//! Rendering policy: full-content vs virtual (windowed) rendering.
//!
//! `decide` is pure and monotonic in both inputs. Thresholds are strict: a
//! file exactly at a threshold still renders in full.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{LargeFileError, Result, open_regular};
use crate::line_index::{LineCount, count_lines};

pub const DEFAULT_MEMORY_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_LINE_COUNT_THRESHOLD: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderDecision {
    pub use_virtual_rendering: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPolicy {
    pub memory_threshold_bytes: u64,
    pub line_count_threshold: u64,
}

impl Default for RenderPolicy {
    fn default() -> Self {
        Self {
            memory_threshold_bytes: DEFAULT_MEMORY_THRESHOLD_BYTES,
            line_count_threshold: DEFAULT_LINE_COUNT_THRESHOLD,
        }
    }
}

/// File metadata together with the decision derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProfile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub lines: LineCount,
    pub decision: RenderDecision,
}

impl RenderPolicy {
    pub fn new(memory_threshold_bytes: u64, line_count_threshold: u64) -> Self {
        Self {
            memory_threshold_bytes,
            line_count_threshold,
        }
    }

    pub fn decide(&self, file_size_bytes: u64, line_count: u64) -> RenderDecision {
        RenderDecision {
            use_virtual_rendering: file_size_bytes > self.memory_threshold_bytes
                || line_count > self.line_count_threshold,
        }
    }

    /// Stat and line-count `path`, then decide. A capped count is used as-is:
    /// it is a lower bound, so it can only under-select virtual rendering when
    /// `scan_cap` is at or below the line threshold.
    pub fn inspect(
        &self,
        path: impl AsRef<Path>,
        scan_cap: u64,
        cancel: &CancelToken,
    ) -> Result<FileProfile> {
        let path = path.as_ref();
        let size_bytes = open_regular(path)?
            .metadata()
            .map_err(|e| LargeFileError::from_io(path, e))?
            .len();
        let lines = count_lines(path, scan_cap, cancel)?;
        let decision = self.decide(size_bytes, lines.count);
        debug!(
            target: "largefile.policy",
            file = %path.display(),
            size_bytes,
            line_count = lines.count,
            capped = lines.capped,
            virtual_rendering = decision.use_virtual_rendering,
            "render_decision"
        );
        Ok(FileProfile {
            path: path.to_path_buf(),
            size_bytes,
            lines,
            decision,
        })
    }
}
