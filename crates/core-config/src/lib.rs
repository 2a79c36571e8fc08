//! Configuration loading and parsing.
//!
//! Parses `kanaz.toml` (or an override path provided by the binary):
//!
//! ```toml
//! [large_file]
//! chunk_size_bytes = 1048576
//! context_lines = 100
//! memory_threshold_bytes = 10485760
//! line_count_threshold = 10000
//! scan_cap = 100000
//! fallback_max_lines = 50000
//!
//! [scroll]
//! prefetch_factor = 2
//! visible_lines = 500
//! ```
//!
//! Every key is optional. A missing file or a parse error yields defaults;
//! unknown keys are ignored. Options that must be positive are clamped back to
//! their default by `Config::sanitize` (logged under target `config`), and
//! `prefetch_factor` is capped at `MAX_PREFETCH_FACTOR`.
//!
//! `visible_lines` is an upper bound on the scroll window's line span; the
//! effective span also depends on the viewport and is computed by
//! `Config::apply_context`.

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

/// Upper bound for `[scroll] prefetch_factor`.
pub const MAX_PREFETCH_FACTOR: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub viewport_rows: u16,
    pub status_rows: u16,
}

impl ConfigContext {
    pub fn new(viewport_rows: u16, status_rows: u16) -> Self {
        Self {
            viewport_rows,
            status_rows,
        }
    }

    pub fn text_rows(&self) -> u16 {
        self.viewport_rows.saturating_sub(self.status_rows)
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LargeFileConfig {
    #[serde(default = "LargeFileConfig::default_chunk_size_bytes")]
    pub chunk_size_bytes: usize,
    #[serde(default = "LargeFileConfig::default_context_lines")]
    pub context_lines: usize,
    #[serde(default = "LargeFileConfig::default_memory_threshold_bytes")]
    pub memory_threshold_bytes: u64,
    #[serde(default = "LargeFileConfig::default_line_count_threshold")]
    pub line_count_threshold: u64,
    #[serde(default = "LargeFileConfig::default_scan_cap")]
    pub scan_cap: u64,
    #[serde(default = "LargeFileConfig::default_fallback_max_lines")]
    pub fallback_max_lines: usize,
}

impl Default for LargeFileConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: Self::default_chunk_size_bytes(),
            context_lines: Self::default_context_lines(),
            memory_threshold_bytes: Self::default_memory_threshold_bytes(),
            line_count_threshold: Self::default_line_count_threshold(),
            scan_cap: Self::default_scan_cap(),
            fallback_max_lines: Self::default_fallback_max_lines(),
        }
    }
}

impl LargeFileConfig {
    const fn default_chunk_size_bytes() -> usize {
        1024 * 1024
    }
    const fn default_context_lines() -> usize {
        100
    }
    const fn default_memory_threshold_bytes() -> u64 {
        10 * 1024 * 1024
    }
    const fn default_line_count_threshold() -> u64 {
        10_000
    }
    const fn default_scan_cap() -> u64 {
        100_000
    }
    const fn default_fallback_max_lines() -> usize {
        50_000
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ScrollConfig {
    /// Multiple of the visible span requested on each reload.
    #[serde(default = "ScrollConfig::default_prefetch_factor")]
    pub prefetch_factor: usize,
    #[serde(default = "ScrollConfig::default_visible_lines")]
    pub visible_lines: usize,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            prefetch_factor: Self::default_prefetch_factor(),
            visible_lines: Self::default_visible_lines(),
        }
    }
}

impl ScrollConfig {
    const fn default_prefetch_factor() -> usize {
        2
    }
    const fn default_visible_lines() -> usize {
        500
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub large_file: LargeFileConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Original file contents, when one was read.
    pub raw: Option<String>,
    /// Parsed (or default) data.
    pub file: ConfigFile,
    /// `visible_lines` bounded by the viewport.
    pub effective_span: usize,
}

impl Default for Config {
    fn default() -> Self {
        let file = ConfigFile::default();
        Self {
            raw: None,
            effective_span: file.scroll.visible_lines,
            file,
        }
    }
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("kanaz.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("kanaz").join("kanaz.toml");
    }
    PathBuf::from("kanaz.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            let mut cfg = Config {
                raw: Some(content),
                effective_span: file.scroll.visible_lines,
                file,
            };
            cfg.sanitize();
            Ok(cfg)
        }
        Err(e) => {
            warn!(target: "config", file = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

fn clamp_positive<T>(value: &mut T, default: T, key: &'static str)
where
    T: Copy + PartialEq + Default + std::fmt::Display,
{
    if *value == T::default() {
        info!(target: "config", key, raw = %value, clamped = %default, "large_file_option_clamped");
        *value = default;
    }
}

impl Config {
    /// Reset options that must be strictly positive to their defaults.
    pub fn sanitize(&mut self) {
        let lf = &mut self.file.large_file;
        clamp_positive(
            &mut lf.chunk_size_bytes,
            LargeFileConfig::default_chunk_size_bytes(),
            "chunk_size_bytes",
        );
        clamp_positive(&mut lf.scan_cap, LargeFileConfig::default_scan_cap(), "scan_cap");
        clamp_positive(
            &mut lf.fallback_max_lines,
            LargeFileConfig::default_fallback_max_lines(),
            "fallback_max_lines",
        );
        let scroll = &mut self.file.scroll;
        clamp_positive(
            &mut scroll.prefetch_factor,
            ScrollConfig::default_prefetch_factor(),
            "prefetch_factor",
        );
        if scroll.prefetch_factor > MAX_PREFETCH_FACTOR {
            info!(
                target: "config",
                key = "prefetch_factor",
                raw = scroll.prefetch_factor,
                clamped = MAX_PREFETCH_FACTOR,
                "large_file_option_clamped"
            );
            scroll.prefetch_factor = MAX_PREFETCH_FACTOR;
        }
        clamp_positive(
            &mut scroll.visible_lines,
            ScrollConfig::default_visible_lines(),
            "visible_lines",
        );
        let visible = self.file.scroll.visible_lines;
        if self.effective_span == 0 || self.effective_span > visible {
            self.effective_span = visible;
        }
    }

    /// Bound the scroll span by the viewport's text rows. Returns the
    /// effective span (at least 1).
    pub fn apply_context(&mut self, ctx: ConfigContext) -> usize {
        let configured = self.file.scroll.visible_lines;
        let text_rows = usize::from(ctx.text_rows()).max(1);
        let span = configured.min(text_rows);
        if span != configured {
            info!(
                target: "config",
                configured,
                span,
                text_rows,
                viewport_rows = ctx.viewport_rows,
                status_rows = ctx.status_rows,
                "visible_lines_bounded_by_viewport"
            );
        }
        self.effective_span = span;
        span
    }

    /// Recompute on a viewport change. `Some(new_span)` when it changed.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<usize> {
        let prev = self.effective_span;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl<'a> Write for LockedWriter<'a> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn load_str(content: &str) -> Config {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), content).unwrap();
        load_from(Some(tmp.path().to_path_buf())).unwrap()
    }

    #[test]
    fn default_config_when_missing_file() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file, ConfigFile::default());
        assert_eq!(cfg.file.large_file.chunk_size_bytes, 1_048_576);
        assert_eq!(cfg.file.large_file.context_lines, 100);
        assert_eq!(cfg.file.large_file.memory_threshold_bytes, 10_485_760);
        assert_eq!(cfg.file.large_file.line_count_threshold, 10_000);
        assert_eq!(cfg.file.large_file.scan_cap, 100_000);
        assert_eq!(cfg.file.scroll.prefetch_factor, 2);
    }

    #[test]
    fn parses_large_file_section() {
        let cfg = load_str("[large_file]\nchunk_size_bytes = 4096\ncontext_lines = 20\n");
        assert_eq!(cfg.file.large_file.chunk_size_bytes, 4096);
        assert_eq!(cfg.file.large_file.context_lines, 20);
        // untouched keys keep defaults
        assert_eq!(cfg.file.large_file.scan_cap, 100_000);
        assert!(cfg.raw.is_some());
    }

    #[test]
    fn parse_error_falls_back_to_defaults() {
        let cfg = load_str("[large_file\nchunk_size_bytes = ");
        assert_eq!(cfg.file, ConfigFile::default());
        assert!(cfg.raw.is_none());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let cfg = load_str("[large_file]\nscan_cap = 7\nmystery = true\n[theme]\nname = \"x\"\n");
        assert_eq!(cfg.file.large_file.scan_cap, 7);
    }

    #[test]
    fn zero_values_are_clamped_to_defaults() {
        let cfg = load_str(
            "[large_file]\nchunk_size_bytes = 0\nscan_cap = 0\n[scroll]\nprefetch_factor = 0\n",
        );
        assert_eq!(cfg.file.large_file.chunk_size_bytes, 1_048_576);
        assert_eq!(cfg.file.large_file.scan_cap, 100_000);
        assert_eq!(cfg.file.scroll.prefetch_factor, 2);
    }

    #[test]
    fn oversized_prefetch_factor_is_capped() {
        let cfg = load_str("[scroll]\nprefetch_factor = 4611686018427387903\n");
        assert_eq!(cfg.file.scroll.prefetch_factor, MAX_PREFETCH_FACTOR);
        let cfg = load_str("[scroll]\nprefetch_factor = 64\n");
        assert_eq!(cfg.file.scroll.prefetch_factor, 64);
    }

    #[test]
    fn zero_context_is_allowed() {
        let cfg = load_str("[large_file]\ncontext_lines = 0\n");
        assert_eq!(cfg.file.large_file.context_lines, 0);
    }

    #[test]
    fn viewport_bounds_span() {
        let mut cfg = load_str("[scroll]\nvisible_lines = 40\n");
        assert_eq!(cfg.apply_context(ConfigContext::new(25, 1)), 24);
        assert_eq!(cfg.apply_context(ConfigContext::new(100, 1)), 40);
        assert_eq!(cfg.apply_context(ConfigContext::new(1, 1)), 1);
    }

    #[test]
    fn recompute_reports_changes_only() {
        let mut cfg = Config::default();
        cfg.apply_context(ConfigContext::new(30, 1));
        assert_eq!(cfg.recompute_with_context(ConfigContext::new(30, 1)), None);
        assert_eq!(cfg.recompute_with_context(ConfigContext::new(20, 1)), Some(19));
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        let cfg = with_default(subscriber, || load_str("[scroll]\nvisible_lines = 0\n"));

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("large_file_option_clamped"));
        assert_eq!(cfg.file.scroll.visible_lines, 500);
    }
}
