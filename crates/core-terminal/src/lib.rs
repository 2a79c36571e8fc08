//! Terminal session handling for the pager.
//!
//! `CrosstermBackend` switches into raw mode on the alternate screen and back;
//! `TerminalGuard` restores the terminal on drop, including when the caller
//! unwinds. `ScreenSize` splits the screen into text rows and the status row.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use std::io::stdout;
use tracing::{debug, warn};

/// Used when the terminal cannot report its size (not a tty, CI).
pub const FALLBACK_SIZE: ScreenSize = ScreenSize { cols: 80, rows: 24 };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub cols: u16,
    pub rows: u16,
}

impl ScreenSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Current terminal size, or `FALLBACK_SIZE` when it cannot be queried.
    pub fn query() -> Self {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => Self { cols, rows },
            Err(e) => {
                warn!(target: "runtime", error = %e, "terminal_size_unavailable");
                FALLBACK_SIZE
            }
        }
    }

    /// Rows left for text once the status line is taken; at least one.
    pub fn text_rows(&self) -> usize {
        (self.rows as usize).saturating_sub(1).max(1)
    }
}

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct CrosstermBackend {
    entered: bool,
}

/// Leaves the terminal session when dropped.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }

    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard { backend: self })
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
            debug!(target: "runtime", "terminal_entered");
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
            debug!(target: "runtime", "terminal_left");
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }
}

impl TerminalGuard<'_> {
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.backend.set_title(title)
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        let _ = self.backend.leave();
    }
}
