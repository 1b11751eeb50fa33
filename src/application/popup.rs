use crate::domain::ports::{Placement, WindowHandle, WindowHost};
use crate::error::{EngineError, Result};
use std::sync::Arc;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything except RFC 3986 unreserved characters is escaped in the id segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// An open approval window and the subject it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupHandle {
    pub window: WindowHandle,
    pub payment_id: String,
    pub url: String,
}

/// Owns the approval popup for the engine's session.
///
/// At most one popup is tracked at a time. `open` must run in the same
/// synchronous stretch that handled the creation response, otherwise hosts may
/// treat it as an unsolicited popup and block it.
pub struct PopupController {
    host: Arc<dyn WindowHost>,
    base_url: String,
    width: u32,
    height: u32,
    current: Option<PopupHandle>,
}

impl PopupController {
    pub fn new(
        host: Arc<dyn WindowHost>,
        base_url: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            host,
            base_url: base_url.into(),
            width,
            height,
            current: None,
        }
    }

    /// `<base>/<percent-encoded id>`
    pub fn url_for(&self, payment_id: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            utf8_percent_encode(payment_id, PATH_SEGMENT)
        )
    }

    pub fn placement(&self) -> Placement {
        Placement::centered(self.host.screen_size(), self.width, self.height)
    }

    /// Opens the approval window for `payment_id`.
    ///
    /// If a window for the same id is still open it is focused instead.
    pub fn open(&mut self, payment_id: &str) -> Result<PopupHandle> {
        if let Some(handle) = &self.current
            && handle.payment_id == payment_id
            && !self.host.is_closed(handle.window)
        {
            self.host.focus(handle.window);
            return Ok(handle.clone());
        }
        self.close();

        let url = self.url_for(payment_id);
        let window = self
            .host
            .open(&url, self.placement())
            .ok_or_else(|| EngineError::PopupBlocked {
                payment_id: payment_id.to_string(),
            })?;
        self.host.focus(window);

        let handle = PopupHandle {
            window,
            payment_id: payment_id.to_string(),
            url,
        };
        self.current = Some(handle.clone());
        Ok(handle)
    }

    pub fn focus(&self) {
        if let Some(handle) = &self.current
            && !self.host.is_closed(handle.window)
        {
            self.host.focus(handle.window);
        }
    }

    /// Closes the tracked window, if any. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(handle) = self.current.take()
            && !self.host.is_closed(handle.window)
        {
            self.host.close(handle.window);
        }
    }
}
