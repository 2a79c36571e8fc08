//! Scroll sequences against real files: whatever order loads finish in, the
//! settled view shows exactly the lines of the last requested range.

use core_render::{ScrollOptions, VirtualScrollWindow};

fn numbered(n: usize) -> tempfile::NamedTempFile {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let body: String = (0..n).map(|i| format!("Line {i}\n")).collect();
    std::fs::write(tmp.path(), body).unwrap();
    tmp
}

fn assert_view_matches(w: &VirtualScrollWindow, total: usize) {
    let range = w.range();
    let visible = w.visible_lines();
    let expected = range.line_span.min(total.saturating_sub(range.first_line));
    assert_eq!(visible.len(), expected, "range {range:?}");
    for (offset, (n, text)) in visible.iter().enumerate() {
        assert_eq!(*n, range.first_line + offset);
        assert_eq!(*text, format!("Line {n}"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn burst_of_jumps_settles_on_last_range() {
    let tmp = numbered(5_000);
    let mut w = VirtualScrollWindow::open(tmp.path(), 25, ScrollOptions::default());
    for first in [400usize, 3_900, 12, 2_222, 4_000, 1_337] {
        w.scroll_to(first);
    }
    w.wait_for_load().await;
    assert_eq!(w.range().first_line, 1_337);
    assert_view_matches(&w, 5_000);
    let m = w.metrics();
    assert_eq!(m.applied, 1);
    assert!(m.requested >= 2);
}

#[tokio::test]
async fn line_by_line_scrolling_mostly_hits_prefetch() {
    let tmp = numbered(2_000);
    let mut w = VirtualScrollWindow::open(tmp.path(), 20, ScrollOptions { prefetch_factor: 4 });
    w.wait_for_load().await;
    for _ in 0..200 {
        w.scroll_by(1);
        w.wait_for_load().await;
        assert_view_matches(&w, 2_000);
    }
    let m = w.metrics();
    assert!(
        m.served_from_prefetch > m.requested,
        "prefetch hits {} vs requests {}",
        m.served_from_prefetch,
        m.requested
    );
}

#[tokio::test]
async fn paging_to_the_end_learns_total_and_stops() {
    let tmp = numbered(333);
    let mut w = VirtualScrollWindow::open(tmp.path(), 30, ScrollOptions::default());
    w.wait_for_load().await;
    for _ in 0..20 {
        w.scroll_by(30);
        w.wait_for_load().await;
    }
    assert_eq!(w.total_lines(), Some(333));
    assert_eq!(w.range().first_line, 303);
    assert_view_matches(&w, 333);
}

#[tokio::test]
async fn resize_reloads_only_when_span_outgrows_held_lines() {
    let tmp = numbered(1_000);
    let mut w = VirtualScrollWindow::open(tmp.path(), 10, ScrollOptions::default());
    w.wait_for_load().await;
    assert!(!w.resize(8));
    assert!(w.resize(200));
    w.wait_for_load().await;
    assert_view_matches(&w, 1_000);
}
