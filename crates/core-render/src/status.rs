//! Pager status line composition.
//!
//! Two stages, so indicators can be added or truncated without touching the
//! formatting:
//! 1. `compose_status` produces ordered `StatusSegment`s.
//! 2. `format_status` renders them:
//!    `[MODE] <name> Ln X/Y [loading] [truncated] [12ms] [error: ..]`.

use std::borrow::Cow;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Whole file (up to the fallback limit) held in memory.
    Full,
    /// Only a window of lines held; refilled as the view moves.
    Virtual,
}

impl RenderMode {
    pub fn label(&self) -> &'static str {
        match self {
            RenderMode::Full => "FULL",
            RenderMode::Virtual => "VIRTUAL",
        }
    }
}

pub struct StatusContext<'a> {
    pub mode: RenderMode,
    pub file_name: Option<&'a Path>,
    pub first_line: usize, // 0-based top visible line
    pub total_lines: Option<usize>,
    pub loading: bool,
    /// Fraction of the file read so far when loading everything up front.
    pub progress: Option<f32>,
    pub truncated: bool,
    pub last_load_ms: Option<u64>,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSegment<'a> {
    Mode(&'static str),
    FileName(Cow<'a, str>),
    /// 1-based top line and total when known.
    Position { line_1: usize, total: Option<usize> },
    /// Optional percentage.
    Loading(Option<u8>),
    Truncated,
    LoadTime(u64),
    Error(&'a str),
}

pub fn compose_status<'a>(ctx: &'a StatusContext<'a>) -> Vec<StatusSegment<'a>> {
    let name: Cow<'a, str> = ctx
        .file_name
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy())
        .unwrap_or(Cow::Borrowed("[No Name]"));
    let mut out = Vec::with_capacity(7);
    out.push(StatusSegment::Mode(ctx.mode.label()));
    out.push(StatusSegment::FileName(name));
    out.push(StatusSegment::Position {
        line_1: ctx.first_line + 1,
        total: ctx.total_lines,
    });
    if ctx.loading {
        let pct = ctx
            .progress
            .map(|p| (p.clamp(0.0, 1.0) * 100.0).round() as u8);
        out.push(StatusSegment::Loading(pct));
    }
    if ctx.truncated {
        out.push(StatusSegment::Truncated);
    }
    if let Some(ms) = ctx.last_load_ms {
        out.push(StatusSegment::LoadTime(ms));
    }
    if let Some(e) = ctx.error {
        out.push(StatusSegment::Error(e));
    }
    out
}

pub fn format_status(segments: &[StatusSegment<'_>]) -> String {
    let mut s = String::with_capacity(64);
    for seg in segments {
        match seg {
            StatusSegment::Mode(m) => {
                s.push('[');
                s.push_str(m);
                s.push(']');
            }
            StatusSegment::FileName(name) => {
                s.push(' ');
                s.push_str(name);
            }
            StatusSegment::Position { line_1, total } => match total {
                Some(t) => s.push_str(&format!(" Ln {line_1}/{t}")),
                None => s.push_str(&format!(" Ln {line_1}/?")),
            },
            StatusSegment::Loading(None) => s.push_str(" [loading]"),
            StatusSegment::Loading(Some(pct)) => s.push_str(&format!(" [loading {pct}%]")),
            StatusSegment::Truncated => s.push_str(" [truncated]"),
            StatusSegment::LoadTime(ms) => s.push_str(&format!(" [{ms}ms]")),
            StatusSegment::Error(e) => {
                s.push_str(" [error: ");
                s.push_str(e);
                s.push(']');
            }
        }
    }
    s
}
