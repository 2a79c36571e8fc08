//! Terminal writer.
//!
//! Collects primitive terminal commands for one frame and flushes them in a
//! single write. Commands keep their order; positions are absolute with a
//! (0,0) origin and the caller keeps them in bounds. A writer is short-lived,
//! one per frame.

use anyhow::Result;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{Clear, ClearType},
};
use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    MoveTo(u16, u16),
    /// Clear from the cursor to the end of the current line.
    ClearLine,
    Print(String),
    Reverse(bool),
}

#[derive(Debug, Default)]
pub struct Writer {
    cmds: Vec<Command>,
}

impl Writer {
    pub fn new() -> Self {
        Self { cmds: Vec::new() }
    }
    pub fn move_to(&mut self, x: u16, y: u16) {
        self.cmds.push(Command::MoveTo(x, y));
    }
    pub fn clear_line(&mut self) {
        self.cmds.push(Command::ClearLine);
    }
    pub fn print<S: Into<String>>(&mut self, s: S) {
        let s: String = s.into();
        if !s.is_empty() {
            self.cmds.push(Command::Print(s));
        }
    }
    pub fn reverse(&mut self, on: bool) {
        self.cmds.push(Command::Reverse(on));
    }

    /// Paint `row` at screen line `y`, wiping whatever was there before.
    pub fn row(&mut self, y: u16, row: &str) {
        self.move_to(0, y);
        self.clear_line();
        self.print(row);
    }

    pub fn commands(&self) -> &[Command] {
        &self.cmds
    }

    pub fn flush_to<W: Write>(self, out: &mut W) -> Result<()> {
        for c in self.cmds {
            match c {
                Command::MoveTo(x, y) => queue!(out, MoveTo(x, y))?,
                Command::ClearLine => queue!(out, Clear(ClearType::UntilNewLine))?,
                Command::Print(s) => queue!(out, Print(s))?,
                Command::Reverse(true) => queue!(out, SetAttribute(Attribute::Reverse))?,
                Command::Reverse(false) => queue!(out, SetAttribute(Attribute::NoReverse))?,
            }
        }
        out.flush()?;
        Ok(())
    }

    pub fn flush(self) -> Result<()> {
        self.flush_to(&mut std::io::stdout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_moves_clears_then_prints() {
        let mut w = Writer::new();
        w.row(3, "abc");
        assert_eq!(
            w.commands(),
            &[
                Command::MoveTo(0, 3),
                Command::ClearLine,
                Command::Print("abc".into())
            ]
        );
    }

    #[test]
    fn empty_print_is_skipped() {
        let mut w = Writer::new();
        w.print("");
        assert!(w.commands().is_empty());
    }

    #[test]
    fn flush_emits_text_into_sink() {
        let mut w = Writer::new();
        w.row(0, "hello");
        let mut sink = Vec::new();
        w.flush_to(&mut sink).unwrap();
        let out = String::from_utf8_lossy(&sink);
        assert!(out.contains("hello"));
    }
}
