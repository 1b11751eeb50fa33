use crate::domain::message::InboundMessage;
use crate::domain::ports::{
    CreateRequest, CreateResponse, MessageBus, MessageHandler, PaymentGateway, Placement,
    ScreenSize, SubscriptionId, WindowHandle, WindowHost,
};
use crate::error::CreationError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Payment,
    Payout,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub request: CreateRequest,
}

#[derive(Default)]
struct GatewayState {
    responses: Mutex<VecDeque<Result<CreateResponse, CreationError>>>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Mutex<Option<Arc<Notify>>>,
    started: Notify,
}

/// A gateway that answers from a queue of scripted responses.
///
/// Clones share the same script and call log. With no scripted response left,
/// calls fail with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedGateway {
    state: Arc<GatewayState>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: Result<CreateResponse, CreationError>) {
        lock(&self.state.responses).push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state.calls).clone()
    }

    /// Holds every following call until the returned `Notify` is signalled.
    pub fn gate(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *lock(&self.state.gate) = Some(gate.clone());
        gate
    }

    /// Resolves once a call has reached the gateway.
    pub async fn call_started(&self) {
        self.state.started.notified().await;
    }

    async fn answer(
        &self,
        kind: CallKind,
        request: &CreateRequest,
    ) -> Result<CreateResponse, CreationError> {
        lock(&self.state.calls).push(RecordedCall {
            kind,
            request: request.clone(),
        });
        self.state.started.notify_one();

        let gate = lock(&self.state.gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        lock(&self.state.responses)
            .pop_front()
            .unwrap_or_else(|| Err(CreationError::Transport("no scripted response".to_string())))
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_payment(
        &self,
        request: &CreateRequest,
    ) -> Result<CreateResponse, CreationError> {
        self.answer(CallKind::Payment, request).await
    }

    async fn create_payout(
        &self,
        request: &CreateRequest,
    ) -> Result<CreateResponse, CreationError> {
        self.answer(CallKind::Payout, request).await
    }
}

/// A window host that keeps windows as entries in a table.
pub struct InMemoryWindowHost {
    screen: ScreenSize,
    blocked: AtomicBool,
    next_handle: AtomicU64,
    open: Mutex<HashSet<WindowHandle>>,
    opened: Mutex<Vec<(String, Placement)>>,
    close_calls: AtomicUsize,
    focus_calls: AtomicUsize,
}

impl Default for InMemoryWindowHost {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryWindowHost {
    pub fn new() -> Self {
        Self {
            screen: ScreenSize {
                width: 1920,
                height: 1080,
            },
            blocked: AtomicBool::new(false),
            next_handle: AtomicU64::new(1),
            open: Mutex::new(HashSet::new()),
            opened: Mutex::new(Vec::new()),
            close_calls: AtomicUsize::new(0),
            focus_calls: AtomicUsize::new(0),
        }
    }

    /// A host that refuses every popup.
    pub fn blocking() -> Self {
        let host = Self::new();
        host.set_blocked(true);
        host
    }

    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Every URL ever opened, with its placement.
    pub fn opened(&self) -> Vec<(String, Placement)> {
        lock(&self.opened).clone()
    }

    /// Number of windows currently open.
    pub fn open_count(&self) -> usize {
        lock(&self.open).len()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn focus_calls(&self) -> usize {
        self.focus_calls.load(Ordering::SeqCst)
    }
}

impl WindowHost for InMemoryWindowHost {
    fn screen_size(&self) -> ScreenSize {
        self.screen
    }

    fn open(&self, url: &str, placement: Placement) -> Option<WindowHandle> {
        if self.blocked.load(Ordering::SeqCst) {
            return None;
        }
        let handle = WindowHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        lock(&self.open).insert(handle);
        lock(&self.opened).push((url.to_string(), placement));
        Some(handle)
    }

    fn close(&self, handle: WindowHandle) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.open).remove(&handle);
    }

    fn focus(&self, _handle: WindowHandle) {
        self.focus_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn is_closed(&self, handle: WindowHandle) -> bool {
        !lock(&self.open).contains(&handle)
    }
}

/// A message bus that delivers synchronously to every subscriber.
#[derive(Default)]
pub struct InMemoryMessageBus {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<SubscriptionId, MessageHandler>>,
}

impl InMemoryMessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `message` to every current subscriber.
    ///
    /// Handlers run outside the lock, so they may subscribe or unsubscribe.
    pub fn dispatch(&self, message: InboundMessage) {
        let handlers: Vec<MessageHandler> = lock(&self.handlers).values().cloned().collect();
        for handler in handlers {
            handler(message.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.handlers).len()
    }
}

impl MessageBus for InMemoryMessageBus {
    fn subscribe(&self, handler: MessageHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock(&self.handlers).insert(id, handler);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.handlers).remove(&id);
    }
}
