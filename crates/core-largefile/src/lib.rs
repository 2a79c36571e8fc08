//! Large-file ingestion for the viewer.
//!
//! Components, leaf to root:
//! - `chunks`: streams a file as ordered text chunks of bounded size.
//! - `line_index`: newline counting with a scan cap (`LineCount::capped`).
//! - `window`: loads the lines around a target line (`LineWindow`).
//! - `policy`: decides between full-content and virtual rendering.
//! - `fallback`: bounded full read with progress for the full-content path.
//! - `tasks`: async wrappers running the blocking readers off the caller's
//!   thread.
//!
//! No handle outlives a call: every operation opens, reads and closes the file
//! itself, so any call can be retried or run concurrently with another.

pub mod cancel;
pub mod chunks;
pub mod error;
pub mod fallback;
pub mod line_index;
pub mod policy;
pub mod tasks;
pub mod window;

pub use cancel::CancelToken;
pub use chunks::{Chunk, ChunkReader, DEFAULT_CHUNK_SIZE};
pub use error::{LargeFileError, Result};
pub use fallback::{
    DEFAULT_FALLBACK_MAX_LINES, LoadedLines, estimate_memory_usage, read_lines_with_progress,
};
pub use line_index::{DEFAULT_SCAN_CAP, LineCount, count_lines};
pub use policy::{FileProfile, RenderDecision, RenderPolicy};
pub use window::{DEFAULT_CONTEXT_LINES, LineWindow, load_range, load_window};
