use crate::domain::message::{InboundMessage, TerminalStatus};
use crate::domain::ports::{Placement, ScreenSize, WindowHandle, WindowHost};
use serde::Deserialize;
use std::collections::HashSet;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// A window host for terminals: "opening" a window prints its URL for the user
/// to visit.
pub struct TerminalWindowHost<W: Write + Send> {
    out: Mutex<W>,
    next_handle: AtomicU64,
    open: Mutex<HashSet<WindowHandle>>,
}

impl<W: Write + Send> TerminalWindowHost<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            next_handle: AtomicU64::new(1),
            open: Mutex::new(HashSet::new()),
        }
    }

    fn print(&self, line: std::fmt::Arguments<'_>) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> WindowHost for TerminalWindowHost<W> {
    fn screen_size(&self) -> ScreenSize {
        ScreenSize {
            width: 1280,
            height: 800,
        }
    }

    fn open(&self, url: &str, placement: Placement) -> Option<WindowHandle> {
        tracing::debug!(features = %placement.features(), "Opening approval window");
        let handle = WindowHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle);
        self.print(format_args!("approve at {url}"));
        Some(handle)
    }

    fn close(&self, handle: WindowHandle) {
        let removed = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle);
        if removed {
            self.print(format_args!("approval window closed"));
        }
    }

    fn focus(&self, _handle: WindowHandle) {}

    fn is_closed(&self, handle: WindowHandle) -> bool {
        !self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&handle)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PollReport {
    pub id: String,
    pub status: TerminalStatus,
}

/// One line of terminal input while a payment awaits approval.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TerminalInput {
    Poll { poll: PollReport },
    Message(InboundMessage),
}

impl TerminalInput {
    /// Parses a JSON line. Blank or malformed lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str(line) {
            Ok(input) => Some(input),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognised input line");
                None
            }
        }
    }
}
