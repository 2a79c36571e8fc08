//! Pager frame composition.
//!
//! Turns `(line_number, text)` pairs into screen rows: a right-aligned line
//! number gutter followed by the text cut to the remaining columns. Width is
//! measured per grapheme cluster so wide and combining characters never split.
//! Rows past the end of the content render as `~`.

use crate::writer::Writer;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

pub const TAB_WIDTH: usize = 4;

/// Display columns of one grapheme cluster. Zero-width clusters on their own
/// (a stray combining mark) still take one cell.
#[inline]
pub fn cluster_width(g: &str) -> usize {
    if g == "\t" {
        return TAB_WIDTH;
    }
    UnicodeWidthStr::width(g).max(1)
}

/// Cut `line` to at most `cols` display columns. Tabs expand to spaces up to
/// the next tab stop; a wide cluster that would straddle the edge is dropped.
pub fn fit_to_width(line: &str, cols: usize) -> String {
    let mut out = String::with_capacity(line.len().min(cols * 4));
    let mut used = 0usize;
    for g in line.graphemes(true) {
        if g == "\t" {
            let pad = TAB_WIDTH - (used % TAB_WIDTH);
            let pad = pad.min(cols - used);
            out.extend(std::iter::repeat_n(' ', pad));
            used += pad;
        } else if g.chars().all(char::is_control) {
            // \r left over from mixed endings, escapes, etc.
            continue;
        } else {
            let w = cluster_width(g);
            if used + w > cols {
                break;
            }
            out.push_str(g);
            used += w;
        }
        if used >= cols {
            break;
        }
    }
    out
}

/// Columns needed to print the largest 1-based line number in view, plus a
/// separating space.
pub fn gutter_width(last_line_1: usize) -> usize {
    let mut digits = 1;
    let mut n = last_line_1 / 10;
    while n > 0 {
        digits += 1;
        n /= 10;
    }
    digits + 1
}

/// Build exactly `text_rows` rows for `lines` (0-based numbers) at `cols`
/// columns.
pub fn compose_rows(lines: &[(usize, &str)], text_rows: usize, cols: usize) -> Vec<String> {
    let last = lines.last().map(|(n, _)| n + 1).unwrap_or(1);
    let gutter = gutter_width(last);
    let text_cols = cols.saturating_sub(gutter);
    let mut rows = Vec::with_capacity(text_rows);
    for (n, text) in lines.iter().take(text_rows) {
        if cols <= gutter {
            rows.push(fit_to_width(&format!("{}", n + 1), cols));
            continue;
        }
        let mut row = format!("{:>w$} ", n + 1, w = gutter - 1);
        row.push_str(&fit_to_width(text, text_cols));
        rows.push(row);
    }
    while rows.len() < text_rows {
        rows.push("~".to_string());
    }
    rows
}

/// Queue a full frame: content rows from the top, then the status line in
/// reverse video on the last row.
pub fn paint(writer: &mut Writer, rows: &[String], status: &str, cols: usize) {
    for (y, row) in rows.iter().enumerate() {
        writer.row(y as u16, row);
    }
    let status = fit_to_width(status, cols);
    let pad = cols.saturating_sub(UnicodeWidthStr::width(status.as_str()));
    writer.move_to(0, rows.len() as u16);
    writer.clear_line();
    writer.reverse(true);
    writer.print(format!("{status}{}", " ".repeat(pad)));
    writer.reverse(false);
}
