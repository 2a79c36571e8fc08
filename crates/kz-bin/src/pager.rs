//! Interactive viewer.
//!
//! Small files are read whole (up to `fallback_max_lines`) with a progress
//! indicator; large ones go through a `VirtualScrollWindow` so only the lines
//! near the view are ever held. The event loop selects over terminal input,
//! window load completions, and whole-file load progress.

use anyhow::Result;
use core_config::{Config, ConfigContext};
use core_largefile::{
    CancelToken, LargeFileError, LoadedLines, estimate_memory_usage, read_lines_with_progress,
};
use core_render::frame::{compose_rows, paint};
use core_render::status::{compose_status, format_status};
use core_render::{RenderMode, ScrollOptions, StatusContext, VirtualScrollWindow, Writer};
use core_terminal::{CrosstermBackend, ScreenSize};
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc};
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

const STATUS_ROWS: u16 = 1;

/// Jump target for `Bottom` before the line count is known. The load runs to
/// end of file, learns the total, and the window snaps back to the last page.
const UNKNOWN_END: usize = usize::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerAction {
    LineDown,
    LineUp,
    PageDown,
    PageUp,
    Top,
    Bottom,
    Quit,
}

pub fn map_key(key: &KeyEvent) -> Option<PagerAction> {
    use PagerAction::*;
    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(Quit),
        KeyCode::Char('f') if ctrl => Some(PageDown),
        KeyCode::Char('b') if ctrl => Some(PageUp),
        KeyCode::Char('q') | KeyCode::Esc => Some(Quit),
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Enter => Some(LineDown),
        KeyCode::Char('k') | KeyCode::Up => Some(LineUp),
        KeyCode::Char(' ') | KeyCode::PageDown => Some(PageDown),
        KeyCode::Char('b') | KeyCode::PageUp => Some(PageUp),
        KeyCode::Char('g') | KeyCode::Home => Some(Top),
        KeyCode::Char('G') | KeyCode::End => Some(Bottom),
        _ => None,
    }
}

#[derive(Debug)]
pub enum FullLoadEvent {
    Progress(f32),
    Done(Result<LoadedLines, LargeFileError>),
}

/// Whole file held in memory.
#[derive(Debug)]
struct FullView {
    lines: Vec<String>,
    truncated: bool,
    first_line: usize,
    span: usize,
}

impl FullView {
    fn new(loaded: LoadedLines, span: usize) -> Self {
        Self {
            lines: loaded.lines,
            truncated: loaded.truncated,
            first_line: 0,
            span: span.max(1),
        }
    }

    fn scroll_to(&mut self, first_line: usize) {
        let max_first = self.lines.len().saturating_sub(self.span);
        self.first_line = first_line.min(max_first);
    }

    fn scroll_by(&mut self, delta: isize) {
        let first = if delta < 0 {
            self.first_line.saturating_sub(delta.unsigned_abs())
        } else {
            self.first_line.saturating_add(delta as usize)
        };
        self.scroll_to(first);
    }

    fn resize(&mut self, span: usize) {
        self.span = span.max(1);
        self.scroll_to(self.first_line);
    }

    fn visible(&self) -> Vec<(usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .skip(self.first_line)
            .take(self.span)
            .map(|(n, l)| (n, l.as_str()))
            .collect()
    }
}

#[derive(Debug)]
enum Content {
    Virtual(VirtualScrollWindow),
    Loading { percent: u8 },
    Full(FullView),
    Failed(String),
}

#[derive(Debug)]
pub struct Pager {
    path: PathBuf,
    config: Config,
    size: ScreenSize,
    content: Content,
    cancel: CancelToken,
}

impl Pager {
    /// Open `path` in virtual mode. Must run inside a tokio runtime.
    pub fn open_virtual(path: PathBuf, mut config: Config, size: ScreenSize) -> Self {
        let span = config.apply_context(ConfigContext::new(size.rows, STATUS_ROWS));
        let options = ScrollOptions {
            prefetch_factor: config.file.scroll.prefetch_factor,
        };
        let window = VirtualScrollWindow::open(&path, span, options);
        info!(target: "runtime", file = %path.display(), span, mode = "virtual", "pager_opened");
        Self {
            path,
            config,
            size,
            content: Content::Virtual(window),
            cancel: CancelToken::new(),
        }
    }

    /// Open `path` in full mode: the file is read on the blocking pool and
    /// progress arrives on the returned receiver.
    pub fn open_full(
        path: PathBuf,
        mut config: Config,
        size: ScreenSize,
    ) -> (Self, mpsc::UnboundedReceiver<FullLoadEvent>) {
        let span = config.apply_context(ConfigContext::new(size.rows, STATUS_ROWS));
        let cancel = CancelToken::new();
        let rx = spawn_full_load(
            path.clone(),
            config.file.large_file.fallback_max_lines,
            cancel.clone(),
        );
        info!(target: "runtime", file = %path.display(), span, mode = "full", "pager_opened");
        let pager = Self {
            path,
            config,
            size,
            content: Content::Loading { percent: 0 },
            cancel,
        };
        (pager, rx)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn span(&self) -> usize {
        self.config.effective_span
    }

    /// Present only in virtual mode.
    pub fn load_notifier(&self) -> Option<Arc<Notify>> {
        match &self.content {
            Content::Virtual(w) => Some(w.load_notifier()),
            _ => None,
        }
    }

    /// Returns `true` when the screen should be redrawn.
    pub fn apply(&mut self, action: PagerAction) -> bool {
        let span = self.span() as isize;
        match &mut self.content {
            Content::Virtual(w) => {
                match action {
                    PagerAction::LineDown => w.scroll_by(1),
                    PagerAction::LineUp => w.scroll_by(-1),
                    PagerAction::PageDown => w.scroll_by(span),
                    PagerAction::PageUp => w.scroll_by(-span),
                    PagerAction::Top => w.scroll_to(0),
                    PagerAction::Bottom => w.scroll_to(w.total_lines().unwrap_or(UNKNOWN_END)),
                    PagerAction::Quit => return false,
                };
                true
            }
            Content::Full(v) => {
                match action {
                    PagerAction::LineDown => v.scroll_by(1),
                    PagerAction::LineUp => v.scroll_by(-1),
                    PagerAction::PageDown => v.scroll_by(span),
                    PagerAction::PageUp => v.scroll_by(-span),
                    PagerAction::Top => v.scroll_to(0),
                    PagerAction::Bottom => v.scroll_to(v.lines.len()),
                    PagerAction::Quit => return false,
                }
                true
            }
            Content::Loading { .. } | Content::Failed(_) => false,
        }
    }

    pub fn on_resize(&mut self, size: ScreenSize) -> bool {
        self.size = size;
        let ctx = ConfigContext::new(size.rows, STATUS_ROWS);
        if let Some(span) = self.config.recompute_with_context(ctx) {
            debug!(target: "runtime", cols = size.cols, rows = size.rows, span, "pager_resized");
            match &mut self.content {
                Content::Virtual(w) => {
                    w.resize(span);
                }
                Content::Full(v) => v.resize(span),
                Content::Loading { .. } | Content::Failed(_) => {}
            }
        }
        true
    }

    /// Apply finished window loads.
    pub fn poll_loads(&mut self) -> bool {
        match &mut self.content {
            Content::Virtual(w) => w.poll(),
            _ => false,
        }
    }

    pub fn on_full_load(&mut self, event: FullLoadEvent) -> bool {
        match event {
            FullLoadEvent::Progress(p) => {
                let Content::Loading { percent } = &mut self.content else {
                    return false;
                };
                let next = (p.clamp(0.0, 1.0) * 100.0) as u8;
                if next == *percent {
                    return false;
                }
                *percent = next;
                true
            }
            FullLoadEvent::Done(Ok(loaded)) => {
                info!(
                    target: "runtime",
                    lines = loaded.lines.len(),
                    truncated = loaded.truncated,
                    bytes_read = loaded.bytes_read,
                    estimated_bytes = estimate_memory_usage(&loaded.lines),
                    "full_load_complete"
                );
                self.content = Content::Full(FullView::new(loaded, self.span()));
                true
            }
            FullLoadEvent::Done(Err(LargeFileError::Cancelled)) => false,
            FullLoadEvent::Done(Err(e)) => {
                warn!(target: "runtime", error = %e, "full_load_failed");
                self.content = Content::Failed(e.to_string());
                true
            }
        }
    }

    /// Queue the whole screen.
    pub fn frame(&self) -> Writer {
        let cols = usize::from(self.size.cols);
        let text_rows = self.size.text_rows();
        let file_name = Some(self.path.as_path());
        let mut ctx = StatusContext {
            mode: RenderMode::Full,
            file_name,
            first_line: 0,
            total_lines: None,
            loading: false,
            progress: None,
            truncated: false,
            last_load_ms: None,
            error: None,
        };
        let window_error = match &self.content {
            Content::Virtual(w) => w.last_error().map(|e| e.to_string()),
            _ => None,
        };
        let rows = match &self.content {
            Content::Virtual(w) => {
                let m = w.metrics();
                ctx.mode = RenderMode::Virtual;
                ctx.first_line = w.range().first_line;
                ctx.total_lines = w.total_lines();
                ctx.loading = w.is_loading();
                ctx.last_load_ms = (m.applied > 0).then_some(m.last_load_ns / 1_000_000);
                ctx.error = window_error.as_deref();
                compose_rows(&w.visible_lines(), text_rows, cols)
            }
            Content::Full(v) => {
                ctx.first_line = v.first_line;
                ctx.total_lines = Some(v.lines.len());
                ctx.truncated = v.truncated;
                compose_rows(&v.visible(), text_rows, cols)
            }
            Content::Loading { percent } => {
                ctx.loading = true;
                ctx.progress = Some(f32::from(*percent) / 100.0);
                compose_rows(&[], text_rows, cols)
            }
            Content::Failed(msg) => {
                ctx.error = Some(msg.as_str());
                compose_rows(&[], text_rows, cols)
            }
        };
        let status = format_status(&compose_status(&ctx));
        let mut writer = Writer::new();
        paint(&mut writer, &rows, &status, cols);
        writer
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn spawn_full_load(
    path: PathBuf,
    max_lines: usize,
    cancel: CancelToken,
) -> mpsc::UnboundedReceiver<FullLoadEvent> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::task::spawn_blocking(move || {
        let progress_tx = tx.clone();
        let result = read_lines_with_progress(
            &path,
            max_lines,
            |p| {
                let _ = progress_tx.send(FullLoadEvent::Progress(p));
            },
            &cancel,
        );
        let _ = tx.send(FullLoadEvent::Done(result));
    });
    rx
}

async fn load_signal(notify: &Option<Arc<Notify>>) {
    match notify {
        Some(n) => n.notified().await,
        None => std::future::pending().await,
    }
}

/// Run the viewer until the user quits. The terminal is restored on every
/// exit path, including errors.
pub async fn run(path: PathBuf, config: Config, use_virtual: bool) -> Result<()> {
    let mut backend = CrosstermBackend::new();
    let mut guard = backend.enter_guard()?;
    let title = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "kanaz".to_string());
    guard.set_title(&title)?;

    let size = ScreenSize::query();
    let (mut pager, mut full_rx) = if use_virtual {
        let (_tx, rx) = mpsc::unbounded_channel();
        (Pager::open_virtual(path, config, size), rx)
    } else {
        Pager::open_full(path, config, size)
    };
    let notify = pager.load_notifier();
    let mut events = EventStream::new();
    pager.frame().flush()?;

    loop {
        let redraw = tokio::select! {
            maybe = events.next() => match maybe {
                Some(Ok(Event::Key(key))) => match map_key(&key) {
                    Some(PagerAction::Quit) => break,
                    Some(action) => pager.apply(action),
                    None => false,
                },
                Some(Ok(Event::Resize(cols, rows))) => pager.on_resize(ScreenSize::new(cols, rows)),
                Some(Ok(_)) => false,
                Some(Err(e)) => {
                    warn!(target: "runtime", error = %e, "terminal_event_error");
                    return Err(e.into());
                }
                None => break,
            },
            _ = load_signal(&notify) => pager.poll_loads(),
            Some(event) = full_rx.recv() => pager.on_full_load(event),
        };
        if redraw {
            pager.frame().flush()?;
        }
    }
    info!(target: "runtime", file = %pager.path().display(), "pager_closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_render::writer::Command;

    fn numbered(n: usize) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let body: String = (0..n).map(|i| format!("Line {i}\n")).collect();
        std::fs::write(tmp.path(), body).unwrap();
        tmp
    }

    fn printed(w: &Writer) -> Vec<String> {
        w.commands()
            .iter()
            .filter_map(|c| match c {
                Command::Print(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn keys_map_to_actions() {
        let none = KeyModifiers::NONE;
        assert_eq!(map_key(&key(KeyCode::Char('j'), none)), Some(PagerAction::LineDown));
        assert_eq!(map_key(&key(KeyCode::Up, none)), Some(PagerAction::LineUp));
        assert_eq!(map_key(&key(KeyCode::PageDown, none)), Some(PagerAction::PageDown));
        assert_eq!(map_key(&key(KeyCode::Char('b'), none)), Some(PagerAction::PageUp));
        assert_eq!(
            map_key(&key(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            Some(PagerAction::Bottom)
        );
        assert_eq!(
            map_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(PagerAction::Quit)
        );
        assert_eq!(map_key(&key(KeyCode::Char('x'), none)), None);
    }

    #[test]
    fn key_release_is_ignored() {
        let mut k = key(KeyCode::Char('j'), KeyModifiers::NONE);
        k.kind = KeyEventKind::Release;
        assert_eq!(map_key(&k), None);
    }

    #[test]
    fn full_view_clamps_to_last_page() {
        let loaded = LoadedLines {
            lines: (0..10).map(|i| i.to_string()).collect(),
            truncated: false,
            bytes_read: 20,
        };
        let mut v = FullView::new(loaded, 4);
        v.scroll_by(100);
        assert_eq!(v.first_line, 6);
        v.scroll_by(-2);
        assert_eq!(v.first_line, 4);
        v.resize(8);
        assert_eq!(v.first_line, 2);
        assert_eq!(v.visible().len(), 8);
    }

    #[tokio::test]
    async fn full_mode_loads_and_pages() {
        let tmp = numbered(100);
        let (mut pager, mut rx) = Pager::open_full(
            tmp.path().to_path_buf(),
            Config::default(),
            ScreenSize::new(40, 11),
        );
        assert_eq!(pager.span(), 10);
        let mut done = false;
        while let Some(ev) = rx.recv().await {
            done |= matches!(ev, FullLoadEvent::Done(_));
            pager.on_full_load(ev);
        }
        assert!(done);
        assert!(pager.apply(PagerAction::PageDown));
        let out = printed(&pager.frame());
        assert_eq!(out[0], "11 Line 10");
        assert!(out.last().unwrap().starts_with("[FULL]"));
        assert!(out.last().unwrap().contains("Ln 11/100"));
    }

    #[tokio::test]
    async fn virtual_mode_renders_after_load() {
        let tmp = numbered(1_000);
        let mut pager = Pager::open_virtual(
            tmp.path().to_path_buf(),
            Config::default(),
            ScreenSize::new(40, 6),
        );
        let notify = pager.load_notifier().unwrap();
        notify.notified().await;
        assert!(pager.poll_loads());
        let out = printed(&pager.frame());
        assert_eq!(out[0], "1 Line 0");
        assert!(out.last().unwrap().starts_with("[VIRTUAL]"));
    }

    #[tokio::test]
    async fn missing_file_in_full_mode_shows_error() {
        let (mut pager, mut rx) = Pager::open_full(
            PathBuf::from("/definitely/not/here.log"),
            Config::default(),
            ScreenSize::new(60, 5),
        );
        while let Some(ev) = rx.recv().await {
            pager.on_full_load(ev);
        }
        let out = printed(&pager.frame());
        assert!(out.last().unwrap().contains("[error: file not found"));
        assert!(!pager.apply(PagerAction::LineDown));
    }

    #[tokio::test]
    async fn resize_changes_span() {
        let tmp = numbered(10);
        let (mut pager, _rx) = Pager::open_full(
            tmp.path().to_path_buf(),
            Config::default(),
            ScreenSize::new(40, 11),
        );
        assert!(pager.on_resize(ScreenSize::new(40, 21)));
        assert_eq!(pager.span(), 20);
    }
}
