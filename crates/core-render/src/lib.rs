//! Viewport-driven rendering for large files.
//!
//! - `viewport`: the visible line range and its scroll arithmetic.
//! - `virtual_scroll`: keeps a window of lines around the visible range,
//!   prefetching ahead of the view and loading off the async runtime. Only the
//!   most recently requested range may replace what is held.
//! - `metrics`: load counters (requested, applied, stale, prefetch hits).
//! - `frame` / `status` / `writer`: turn the held lines into terminal rows, a
//!   status line, and a batch of crossterm commands.

pub mod frame;
pub mod metrics;
pub mod status;
pub mod viewport;
pub mod virtual_scroll;
pub mod writer;

pub use metrics::{ScrollMetrics, ScrollMetricsSnapshot};
pub use status::{RenderMode, StatusContext};
pub use viewport::VisibleRange;
pub use virtual_scroll::{DEFAULT_PREFETCH_FACTOR, LoadState, ScrollOptions, VirtualScrollWindow};
pub use writer::Writer;
