//! Visible row range of the rendering surface.
//!
//! Guarantees:
//! * `first_line` is the 0-based index of the topmost line on screen.
//! * `line_span` is the number of text rows (status line excluded); always >= 1.
//! * Only the owning `VirtualScrollWindow` mutates a range; other components
//!   read it to decide whether a reload is needed.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub first_line: usize,
    pub line_span: usize,
}

impl VisibleRange {
    pub fn new(first_line: usize, line_span: usize) -> Self {
        Self {
            first_line,
            line_span: line_span.max(1),
        }
    }

    /// One past the last visible line.
    pub fn end_line(&self) -> usize {
        self.first_line.saturating_add(self.line_span)
    }

    pub fn contains(&self, line: usize) -> bool {
        line >= self.first_line && line < self.end_line()
    }

    /// Shift by a signed line delta, saturating at zero.
    pub fn scrolled_by(&self, delta: isize) -> Self {
        let first_line = if delta < 0 {
            self.first_line.saturating_sub(delta.unsigned_abs())
        } else {
            self.first_line.saturating_add(delta as usize)
        };
        Self { first_line, ..*self }
    }

    /// Keep the range inside `[0, total_lines)` when the total is known.
    pub fn clamped_to(&self, total_lines: usize) -> Self {
        let max_first = total_lines.saturating_sub(self.line_span);
        Self {
            first_line: self.first_line.min(max_first),
            ..*self
        }
    }
}
