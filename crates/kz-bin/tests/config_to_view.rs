use core_config::{ConfigContext, load_from};
use core_largefile::{CancelToken, RenderPolicy};
use core_render::{ScrollOptions, VirtualScrollWindow};
use std::io::Write;

// Configured thresholds decide the mode, and the configured span and prefetch
// factor drive the scroll window the viewer would open.
#[tokio::test]
async fn configured_thresholds_select_virtual_window() {
    let mut cfg_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        cfg_file,
        "[large_file]\nline_count_threshold = 100\n\n\
         [scroll]\nprefetch_factor = 3\nvisible_lines = 15"
    )
    .unwrap();
    let mut config = load_from(Some(cfg_file.path().to_path_buf())).unwrap();
    let span = config.apply_context(ConfigContext::new(50, 1));
    assert_eq!(span, 15);

    let data = tempfile::NamedTempFile::new().unwrap();
    let body: String = (0..500).map(|i| format!("Line {i}\n")).collect();
    std::fs::write(data.path(), body).unwrap();

    let lf = &config.file.large_file;
    let policy = RenderPolicy::new(lf.memory_threshold_bytes, lf.line_count_threshold);
    let profile = policy
        .inspect(data.path(), lf.scan_cap, &CancelToken::new())
        .unwrap();
    assert!(profile.decision.use_virtual_rendering);

    let mut window = VirtualScrollWindow::open(
        data.path(),
        span,
        ScrollOptions {
            prefetch_factor: config.file.scroll.prefetch_factor,
        },
    );
    window.wait_for_load().await;
    window.scroll_to(250);
    window.wait_for_load().await;
    let visible = window.visible_lines();
    assert_eq!(visible.len(), 15);
    assert_eq!(visible[0], (250, "Line 250"));
}

#[test]
fn defaults_keep_small_files_in_full_mode() {
    let config = load_from(Some("/definitely/not/kanaz.toml".into())).unwrap();
    let lf = &config.file.large_file;
    let policy = RenderPolicy::new(lf.memory_threshold_bytes, lf.line_count_threshold);
    assert!(!policy.decide(4096, 120).use_virtual_rendering);
}
