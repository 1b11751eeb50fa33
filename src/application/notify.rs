use crate::domain::amount::Amount;
use crate::error::EngineError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub type DeliveryCallback = Arc<dyn Fn(&str, Amount) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&EngineError) + Send + Sync>;
pub type BusyCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Caller-facing notifications. Every callback is optional.
#[derive(Clone, Default)]
pub struct Callbacks {
    on_created: Option<DeliveryCallback>,
    on_approved: Option<DeliveryCallback>,
    on_error: Option<ErrorCallback>,
    on_busy_change: Option<BusyCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_created(mut self, f: impl Fn(&str, Amount) + Send + Sync + 'static) -> Self {
        self.on_created = Some(Arc::new(f));
        self
    }

    pub fn on_approved(mut self, f: impl Fn(&str, Amount) + Send + Sync + 'static) -> Self {
        self.on_approved = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&EngineError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_busy_change(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.on_busy_change = Some(Arc::new(f));
        self
    }

    pub(crate) fn created(&self, id: &str, amount: Amount) {
        if let Some(f) = &self.on_created {
            f(id, amount);
        }
    }

    pub(crate) fn approved(&self, id: &str, amount: Amount) {
        if let Some(f) = &self.on_approved {
            f(id, amount);
        }
    }

    pub(crate) fn error(&self, error: &EngineError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_created", &self.on_created.is_some())
            .field("on_approved", &self.on_approved.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_busy_change", &self.on_busy_change.is_some())
            .finish()
    }
}

/// Tracks whether a request is in progress and reports edges to the host.
pub struct BusyIndicator {
    busy: AtomicBool,
    on_change: Option<BusyCallback>,
}

impl BusyIndicator {
    pub fn new(callbacks: &Callbacks) -> Self {
        Self {
            busy: AtomicBool::new(false),
            on_change: callbacks.on_busy_change.clone(),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Marks the indicator busy until the returned guard is dropped.
    pub fn hold(&self) -> BusyGuard<'_> {
        self.set(true);
        BusyGuard {
            indicator: self,
            armed: true,
        }
    }

    pub fn release(&self) {
        self.set(false);
    }

    fn set(&self, busy: bool) {
        let previous = self.busy.swap(busy, Ordering::SeqCst);
        if previous != busy
            && let Some(f) = &self.on_change
        {
            f(busy);
        }
    }
}

impl fmt::Debug for BusyIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusyIndicator")
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Releases the busy indicator on drop, on every exit path.
#[must_use]
pub struct BusyGuard<'a> {
    indicator: &'a BusyIndicator,
    armed: bool,
}

impl BusyGuard<'_> {
    /// Leaves the indicator busy past the guard's scope; someone else releases it.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.indicator.release();
        }
    }
}
