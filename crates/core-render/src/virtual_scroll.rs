//! Virtual scroll window.
//!
//! Materializes only the lines around the visible range of a large file and
//! refills them asynchronously when the range moves.
//!
//! State machine:
//! - `Idle`: no load for the current range is outstanding.
//! - `Loading`: a `load_window` call for the current range runs on tokio's
//!   blocking pool.
//!
//! Reload policy:
//! - Every request covers `prefetch_factor` times the visible span (never less
//!   than twice the span) centred on the middle of the visible range, so small
//!   scroll deltas are served from the lines already held.
//! - A range already covered by the materialized lines issues no request. If a
//!   load was outstanding it is abandoned (its token cancelled, its result
//!   discarded) since the held lines are already correct.
//!
//! Ordering: each request carries a generation number. Only the completion
//! whose generation equals the latest issued one is applied (last range wins);
//! completions of superseded requests are dropped whatever order they arrive
//! in.
//!
//! Failure: a failed load leaves the held lines untouched and records the
//! error in `last_error()` until the next successful load.
//!
//! Every spawned load reports exactly one completion, including when the task
//! unwinds or is dropped before it runs, so `wait_for_load` always returns.
//!
//! Requests spawn onto the ambient tokio runtime, so range changes must be made
//! from within one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_largefile::{CancelToken, LargeFileError, LineWindow, load_window};
use tokio::sync::{Notify, mpsc};
use tracing::{debug, trace, warn};

use crate::metrics::{ScrollMetrics, ScrollMetricsSnapshot};
use crate::viewport::VisibleRange;

pub const DEFAULT_PREFETCH_FACTOR: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOptions {
    pub prefetch_factor: usize,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            prefetch_factor: DEFAULT_PREFETCH_FACTOR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
}

#[derive(Debug)]
struct LoadCompletion {
    generation: u64,
    result: Result<LineWindow, LargeFileError>,
    elapsed: Duration,
}

/// Sends a load's completion once. Dropped unsent, it reports the load as
/// failed.
struct CompletionSender {
    generation: u64,
    path: PathBuf,
    started: Instant,
    tx: Option<mpsc::UnboundedSender<LoadCompletion>>,
    wake: Arc<Notify>,
}

impl CompletionSender {
    fn send(&mut self, result: Result<LineWindow, LargeFileError>) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let completion = LoadCompletion {
            generation: self.generation,
            result,
            elapsed: self.started.elapsed(),
        };
        if tx.send(completion).is_ok() {
            self.wake.notify_one();
        }
    }
}

impl Drop for CompletionSender {
    fn drop(&mut self) {
        if self.tx.is_some() {
            let source = std::io::Error::other("window load aborted");
            let err = LargeFileError::Io {
                path: self.path.clone(),
                source,
            };
            self.send(Err(err));
        }
    }
}

pub struct VirtualScrollWindow {
    path: PathBuf,
    range: VisibleRange,
    prefetch_factor: usize,
    window: LineWindow,
    loaded: bool,
    total_lines: Option<usize>,
    state: LoadState,
    generation: u64,
    in_flight: Option<CancelToken>,
    last_error: Option<LargeFileError>,
    tx: mpsc::UnboundedSender<LoadCompletion>,
    rx: mpsc::UnboundedReceiver<LoadCompletion>,
    wake: Arc<Notify>,
    metrics: ScrollMetrics,
}

impl std::fmt::Debug for VirtualScrollWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualScrollWindow")
            .field("path", &self.path)
            .field("range", &self.range)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .field("first_loaded", &self.window.first_line)
            .field("loaded_lines", &self.window.len())
            .field("total_lines", &self.total_lines)
            .finish()
    }
}

impl VirtualScrollWindow {
    /// Create a window over `path` showing `line_span` rows from line 0 and
    /// issue the initial load.
    pub fn open(path: impl AsRef<Path>, line_span: usize, options: ScrollOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut window = Self {
            path: path.as_ref().to_path_buf(),
            range: VisibleRange::new(0, line_span),
            prefetch_factor: options.prefetch_factor.max(1),
            window: LineWindow::default(),
            loaded: false,
            total_lines: None,
            state: LoadState::Idle,
            generation: 0,
            in_flight: None,
            last_error: None,
            tx,
            rx,
            wake: Arc::new(Notify::new()),
            metrics: ScrollMetrics::default(),
        };
        window.request_load();
        window
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn range(&self) -> VisibleRange {
        self.range
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    /// Error of the most recent failed load, cleared by the next success.
    pub fn last_error(&self) -> Option<&LargeFileError> {
        self.last_error.as_ref()
    }

    /// Line count learned from a load that reached end of file, or supplied by
    /// the caller.
    pub fn total_lines(&self) -> Option<usize> {
        self.total_lines
    }

    /// The materialized lines (may extend beyond the visible range).
    pub fn materialized(&self) -> &LineWindow {
        &self.window
    }

    pub fn metrics(&self) -> ScrollMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Notified after every completion is queued. Waiting on it borrows nothing
    /// from the window, so it can sit in a `select!` next to input handling.
    pub fn load_notifier(&self) -> Arc<Notify> {
        self.wake.clone()
    }

    /// Held lines intersecting the visible range, with 0-based line numbers.
    pub fn visible_lines(&self) -> Vec<(usize, &str)> {
        let range = self.range;
        self.window
            .numbered()
            .filter(|(n, _)| range.contains(*n))
            .collect()
    }

    /// Move the top of the view to `first_line`. Returns `true` when a reload
    /// was issued.
    pub fn scroll_to(&mut self, first_line: usize) -> bool {
        self.update_range(VisibleRange::new(first_line, self.range.line_span))
    }

    pub fn scroll_by(&mut self, delta: isize) -> bool {
        self.update_range(self.range.scrolled_by(delta))
    }

    pub fn resize(&mut self, line_span: usize) -> bool {
        self.update_range(VisibleRange::new(self.range.first_line, line_span))
    }

    /// Supply a known line count so scrolling clamps to the last page.
    pub fn set_total_lines(&mut self, total: usize) -> bool {
        self.total_lines = Some(total);
        self.update_range(self.range)
    }

    fn update_range(&mut self, range: VisibleRange) -> bool {
        let range = match self.total_lines {
            Some(total) => range.clamped_to(total),
            None => range,
        };
        self.range = range;
        if self.covers(range) {
            self.metrics.incr_prefetch_hit();
            if let Some(token) = self.in_flight.take() {
                // Held lines already match; the outstanding load is stale.
                token.cancel();
                self.generation += 1;
                self.state = LoadState::Idle;
                trace!(
                    target: "render.scroll",
                    generation = self.generation,
                    "window_load_abandoned"
                );
            }
            return false;
        }
        self.request_load();
        true
    }

    fn covers(&self, range: VisibleRange) -> bool {
        if !self.loaded || range.first_line < self.window.first_line {
            return false;
        }
        if range.end_line() <= self.window.end_line() {
            return true;
        }
        self.window.reached_eof() && range.first_line <= self.window.end_line()
    }

    fn request_load(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        let span = self.range.line_span;
        let context = (span.saturating_mul(self.prefetch_factor) / 2).max(span);
        let target = self.range.first_line.saturating_add(span / 2);

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancelToken::new();
        self.in_flight = Some(cancel.clone());
        self.state = LoadState::Loading;
        self.metrics.incr_requested();
        debug!(
            target: "render.scroll",
            generation,
            first_line = self.range.first_line,
            line_span = span,
            target_line = target,
            context_lines = context,
            "window_reload_requested"
        );

        let mut sender = CompletionSender {
            generation,
            path: self.path.clone(),
            started: Instant::now(),
            tx: Some(self.tx.clone()),
            wake: self.wake.clone(),
        };
        tokio::task::spawn_blocking(move || {
            sender.started = Instant::now();
            let result = load_window(&sender.path, target, context, &cancel);
            sender.send(result);
        });
    }

    /// Apply one completion. Returns `true` when held lines or the error
    /// indicator changed.
    fn apply(&mut self, completion: LoadCompletion) -> bool {
        if completion.generation != self.generation {
            self.metrics.incr_discarded();
            trace!(
                target: "render.scroll",
                stale = completion.generation,
                current = self.generation,
                "window_load_discarded"
            );
            return false;
        }
        self.in_flight = None;
        self.state = LoadState::Idle;
        match completion.result {
            Ok(window) => {
                let load_ns = u64::try_from(completion.elapsed.as_nanos()).unwrap_or(u64::MAX);
                self.metrics.incr_applied(load_ns);
                if let Some(total) = window.total_lines {
                    self.total_lines = Some(total);
                }
                self.window = window;
                self.loaded = true;
                self.last_error = None;
                // Snap back if the range ran past a newly learned end of file.
                if let Some(total) = self.total_lines {
                    let clamped = self.range.clamped_to(total);
                    if clamped != self.range {
                        self.update_range(clamped);
                    }
                }
                true
            }
            Err(LargeFileError::Cancelled) => false,
            Err(err) => {
                self.metrics.incr_failed();
                warn!(
                    target: "render.scroll",
                    error = %err,
                    generation = completion.generation,
                    "window_load_failed"
                );
                self.last_error = Some(err);
                true
            }
        }
    }

    /// Apply every completion already queued without waiting.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(completion) = self.rx.try_recv() {
            changed |= self.apply(completion);
        }
        changed
    }

    /// Wait until the load for the current range completes and apply it.
    /// Returns immediately (after draining queued completions) when idle.
    pub async fn wait_for_load(&mut self) -> bool {
        let mut changed = self.poll();
        while self.state == LoadState::Loading {
            let Some(completion) = self.rx.recv().await else {
                break;
            };
            changed |= self.apply(completion);
        }
        changed
    }
}

impl Drop for VirtualScrollWindow {
    fn drop(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let content: String = (0..n).map(|i| format!("Line {i}\n")).collect();
        std::fs::write(tmp.path(), content).unwrap();
        tmp
    }

    #[tokio::test]
    async fn initial_load_fills_visible_rows() {
        let tmp = numbered(1_000);
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
        assert!(w.is_loading());
        assert!(w.wait_for_load().await);
        assert_eq!(w.state(), LoadState::Idle);
        let vis = w.visible_lines();
        assert_eq!(vis.len(), 10);
        assert_eq!(vis[0], (0, "Line 0"));
        assert_eq!(vis[9], (9, "Line 9"));
    }

    #[tokio::test]
    async fn small_scroll_is_served_from_prefetch() {
        let tmp = numbered(1_000);
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
        w.wait_for_load().await;
        assert!(!w.scroll_by(3), "delta inside prefetched lines must not reload");
        assert_eq!(w.visible_lines()[0], (3, "Line 3"));
        assert_eq!(w.metrics().requested, 1);
        assert_eq!(w.metrics().served_from_prefetch, 1);
    }

    #[tokio::test]
    async fn big_jump_reloads() {
        let tmp = numbered(1_000);
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
        w.wait_for_load().await;
        assert!(w.scroll_to(500));
        w.wait_for_load().await;
        let vis = w.visible_lines();
        assert_eq!(vis.first(), Some(&(500, "Line 500")));
        assert_eq!(vis.len(), 10);
    }

    #[tokio::test]
    async fn stale_completion_is_discarded() {
        let tmp = numbered(2_000);
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
        w.wait_for_load().await;
        w.scroll_to(800);
        w.scroll_to(1_500);
        w.wait_for_load().await;
        assert_eq!(w.visible_lines().first(), Some(&(1_500, "Line 1500")));
        // Let the superseded load land (or observe its cancellation) and drain it.
        tokio::time::sleep(Duration::from_millis(50)).await;
        w.poll();
        assert_eq!(w.visible_lines().first(), Some(&(1_500, "Line 1500")));
        let m = w.metrics();
        assert_eq!(m.requested, 3);
        assert_eq!(m.applied, 2);
    }

    #[tokio::test]
    async fn failure_keeps_last_good_lines() {
        let tmp = numbered(500);
        let path = tmp.path().to_path_buf();
        let mut w = VirtualScrollWindow::open(&path, 10, ScrollOptions::default());
        w.wait_for_load().await;
        drop(tmp);
        assert!(w.scroll_to(300));
        assert!(w.wait_for_load().await);
        assert!(matches!(w.last_error(), Some(LargeFileError::NotFound { .. })));
        assert_eq!(w.state(), LoadState::Idle);
        // Previous content retained.
        assert_eq!(w.materialized().get(0), Some("Line 0"));
        assert_eq!(w.metrics().failed, 1);
    }

    #[tokio::test]
    async fn learns_total_and_clamps_past_eof() {
        let tmp = numbered(30);
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
        w.wait_for_load().await;
        assert_eq!(w.total_lines(), None, "first load stops before EOF");
        w.scroll_to(100);
        w.wait_for_load().await;
        assert_eq!(w.total_lines(), Some(30));
        assert_eq!(w.range().first_line, 20);
        let vis = w.visible_lines();
        assert_eq!(vis.first(), Some(&(20, "Line 20")));
        assert_eq!(vis.last(), Some(&(29, "Line 29")));
    }

    #[tokio::test]
    async fn scrolling_back_into_held_lines_abandons_load() {
        let tmp = numbered(5_000);
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
        w.wait_for_load().await;
        assert!(w.scroll_to(4_000));
        assert!(!w.scroll_to(2), "back inside held lines");
        assert_eq!(w.state(), LoadState::Idle);
        tokio::time::sleep(Duration::from_millis(50)).await;
        w.poll();
        assert_eq!(w.visible_lines().first(), Some(&(2, "Line 2")));
    }

    #[tokio::test]
    async fn extreme_targets_clamp_instead_of_overflowing() {
        let tmp = numbered(40);
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
        w.wait_for_load().await;
        w.scroll_to(usize::MAX);
        w.wait_for_load().await;
        assert_eq!(w.total_lines(), Some(40));
        assert_eq!(w.range().first_line, 30);

        for _ in 0..3 {
            w.scroll_by(isize::MAX);
        }
        w.wait_for_load().await;
        assert_eq!(w.range().first_line, 30);
        assert_eq!(w.visible_lines().last(), Some(&(39, "Line 39")));
    }

    #[tokio::test]
    async fn huge_prefetch_factor_loads_whole_file() {
        let tmp = numbered(50);
        let options = ScrollOptions {
            prefetch_factor: usize::MAX / 4,
        };
        let mut w = VirtualScrollWindow::open(tmp.path(), 10, options);
        assert!(w.wait_for_load().await);
        assert_eq!(w.materialized().len(), 50);
        assert_eq!(w.total_lines(), Some(50));
        assert!(!w.scroll_to(usize::MAX));
        assert_eq!(w.range().first_line, 40);
    }

    #[tokio::test]
    async fn dropped_load_still_reports_completion() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = CompletionSender {
            generation: 7,
            path: PathBuf::from("big.log"),
            started: Instant::now(),
            tx: Some(tx),
            wake: Arc::new(Notify::new()),
        };
        drop(sender);
        let completion = rx.recv().await.unwrap();
        assert_eq!(completion.generation, 7);
        assert!(matches!(completion.result, Err(LargeFileError::Io { .. })));
    }

    #[tokio::test]
    async fn notifier_fires_on_completion() {
        let tmp = numbered(100);
        let mut w = VirtualScrollWindow::open(tmp.path(), 5, ScrollOptions::default());
        let notify = w.load_notifier();
        tokio::time::timeout(Duration::from_secs(2), notify.notified())
            .await
            .expect("completion notification");
        assert!(w.poll());
        assert_eq!(w.visible_lines().len(), 5);
    }
}
