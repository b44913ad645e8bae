//! Human-facing progress reporting for multi-page searches.
//!
//! The engine reports through [`ProgressSink`]; the terminal implementation
//! rewrites a single status line on stderr and stays silent when stderr is
//! not interactive so piped runs produce clean output.

use std::io::{self, IsTerminal, Stderr, Write};
use std::sync::Mutex;

pub trait ProgressSink: Send + Sync {
    /// Called after each successfully parsed page.
    fn page(&self, page: usize, page_results: usize, total: usize);
    /// Called once when a later page hits the bot wall.
    fn soft_block(&self);
    /// Called when pagination ends, whatever the reason.
    fn finish(&self);
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn page(&self, _page: usize, _page_results: usize, _total: usize) {}
    fn soft_block(&self) {}
    fn finish(&self) {}
}

pub struct TerminalProgress<W: Write + Send> {
    out: Mutex<W>,
    interactive: bool,
}

impl<W: Write + Send> TerminalProgress<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out: Mutex::new(out),
            interactive,
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(w) => w,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    // Progress is best effort; a closed stderr must not fail the search.
    fn emit(&self, text: &str) {
        if !self.interactive {
            return;
        }
        let mut out = match self.out.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

impl TerminalProgress<Stderr> {
    /// Writes to the process stderr, enabled only when it is a terminal.
    pub fn stderr() -> Self {
        let err = io::stderr();
        let interactive = err.is_terminal();
        Self::new(err, interactive)
    }
}

impl<W: Write + Send> ProgressSink for TerminalProgress<W> {
    fn page(&self, page: usize, page_results: usize, total: usize) {
        self.emit(&format!(
            "\rPage {page}: {page_results} results ({total} total)"
        ));
    }

    fn soft_block(&self) {
        self.emit("\nAnti-bot detection hit. Returning results collected so far.\n");
    }

    fn finish(&self) {
        self.emit("\n");
    }
}
