use super::listener::{MessageChannelListener, Subscription};
use super::notify::{BusyIndicator, Callbacks};
use super::popup::PopupController;
use super::{lock, record_creation};
use crate::config::EngineConfig;
use crate::domain::idempotency::IdempotencyKeyGenerator;
use crate::domain::message::{InboundMessage, StatusUpdate, TerminalStatus};
use crate::domain::ports::{CreateRequest, GatewayBox, MessageBus, MessageHandler, WindowHost};
use crate::domain::request::PayloadSource;
use crate::domain::session::{PaymentSession, SessionStatus};
use crate::domain::validator::Validator;
use crate::error::{EngineError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Host capabilities the approval engine needs.
#[derive(Clone)]
pub struct HostCapabilities {
    pub windows: Arc<dyn WindowHost>,
    pub messages: Arc<dyn MessageBus>,
}

/// Which channel reported a terminal status. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Message,
    Poller,
}

/// Tracks one in-flight payment and reports, exactly once, how it ended.
///
/// The engine owns the session, the approval popup and the message subscription.
/// Status reports from the message channel and from an external poller are both
/// funnelled into the same transition, so whichever arrives first decides the
/// outcome and every later report is absorbed.
///
/// Errors never escape the public methods; they are delivered through
/// `Callbacks::on_error`.
pub struct ApprovalEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    validator: Validator,
    keys: IdempotencyKeyGenerator,
    gateway: GatewayBox,
    api_key: Option<String>,
    payload: PayloadSource,
    listener: MessageChannelListener,
    messages: Arc<dyn MessageBus>,
    popup: Mutex<PopupController>,
    session: Mutex<PaymentSession>,
    subscription: Mutex<Option<Subscription>>,
    callbacks: Callbacks,
    busy: BusyIndicator,
    torn_down: AtomicBool,
}

impl ApprovalEngine {
    /// Creates a new `ApprovalEngine`.
    ///
    /// # Arguments
    ///
    /// * `config` - Amount bounds, popup settings and the accepted message origin.
    /// * `gateway` - The remote payment service.
    /// * `host` - Window and message capabilities of the host runtime.
    /// * `payload` - Where request values are read from at click time.
    /// * `callbacks` - Caller notifications.
    pub fn new(
        config: &EngineConfig,
        gateway: GatewayBox,
        host: HostCapabilities,
        payload: PayloadSource,
        callbacks: Callbacks,
    ) -> Self {
        let popup = PopupController::new(
            host.windows,
            config.popup_base_url.clone(),
            config.popup_width,
            config.popup_height,
        );
        let inner = EngineInner {
            validator: config.validator(),
            keys: IdempotencyKeyGenerator::new(),
            gateway,
            api_key: config.api_key.clone(),
            payload,
            listener: MessageChannelListener::new(
                config.allowed_origin(),
                config.message_type.clone(),
            ),
            messages: host.messages,
            popup: Mutex::new(popup),
            session: Mutex::new(PaymentSession::new()),
            subscription: Mutex::new(None),
            busy: BusyIndicator::new(&callbacks),
            callbacks,
            torn_down: AtomicBool::new(false),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Validates the current payload, creates the payment and opens the
    /// approval popup.
    pub async fn start_payment(&self) {
        if let Err(e) = self.inner.run_payment().await {
            self.inner.report(&e);
        }
    }

    /// Feeds a status observed by an out-of-band channel, such as a poller.
    pub fn report_status(&self, payment_id: &str, status: TerminalStatus) {
        self.inner.apply_status(
            StatusUpdate {
                id: payment_id.to_string(),
                status,
            },
            Channel::Poller,
        );
    }

    /// A handle external collaborators can keep to report statuses later.
    ///
    /// It does not keep the engine alive; reports after the engine is gone are
    /// dropped.
    pub fn status_reporter(&self) -> StatusReporter {
        StatusReporter {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Brings the approval popup to the front, if one is open.
    pub fn focus_popup(&self) {
        lock(&self.inner.popup).focus();
    }

    /// Unsubscribes from the message channel and resets the session.
    ///
    /// Closing the popup is attempted. A create call still in flight is not
    /// cancelled; its result is discarded when it arrives.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.inner.session).status()
    }

    pub fn payment_id(&self) -> Option<String> {
        lock(&self.inner.session).id().map(str::to_string)
    }

    pub fn idempotency_key(&self) -> Option<String> {
        lock(&self.inner.session).idempotency_key().map(str::to_string)
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.is_busy()
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.inner.subscription).is_some()
    }
}

impl Drop for ApprovalEngine {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

/// Weak entry point for status reports from outside the engine.
#[derive(Clone)]
pub struct StatusReporter {
    inner: Weak<EngineInner>,
}

impl StatusReporter {
    pub fn report(&self, payment_id: &str, status: TerminalStatus) {
        if let Some(inner) = self.inner.upgrade() {
            inner.apply_status(
                StatusUpdate {
                    id: payment_id.to_string(),
                    status,
                },
                Channel::Poller,
            );
        }
    }
}

impl EngineInner {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    async fn run_payment(self: &Arc<Self>) -> Result<()> {
        if self.is_torn_down() {
            return Ok(());
        }

        let request = self.validator.validate(self.payload.resolve().as_ref())?;
        let idempotency_key = self.keys.generate();
        let ticket = lock(&self.session).begin(request.clone(), idempotency_key.clone())?;
        let busy = self.busy.hold();
        self.ensure_subscribed();

        tracing::info!(amount = %request.amount, "Creating payment");
        let result = self
            .gateway
            .create_payment(&CreateRequest {
                amount: request.amount,
                recipient: request.recipient,
                note: request.note,
                api_key: self.api_key.clone(),
                idempotency_key,
            })
            .await;

        let delivery = {
            let mut session = lock(&self.session);
            if self.is_torn_down() {
                tracing::debug!("Discarding create response after teardown");
                return Ok(());
            }
            record_creation(&mut session, ticket, result)
        };
        let delivery = delivery.inspect_err(|_| self.unsubscribe())?;
        let Some(created) = delivery else {
            return Ok(());
        };

        tracing::info!(payment_id = %created.id, "Payment created");
        self.callbacks.created(&created.id, created.amount);

        // The popup lock is held across the check so a racing resolution either
        // happens before (and we skip the popup) or closes what we open.
        let mut popup = lock(&self.popup);
        if !self.is_awaiting(&created.id) {
            return Ok(());
        }
        match popup.open(&created.id) {
            Ok(handle) => {
                tracing::info!(
                    payment_id = %created.id,
                    url = %handle.url,
                    "Approval popup opened"
                );
                busy.keep();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(payment_id = %created.id, "Approval popup was blocked");
                Err(e)
            }
        }
    }

    fn is_awaiting(&self, payment_id: &str) -> bool {
        let session = lock(&self.session);
        session.status() == SessionStatus::Created && session.id() == Some(payment_id)
    }

    /// Subscribes for the lifetime of the current session. The subscription is
    /// dropped again when the session reaches a terminal status.
    fn ensure_subscribed(self: &Arc<Self>) {
        let mut subscription = lock(&self.subscription);
        if subscription.is_some() {
            return;
        }
        let weak = Arc::downgrade(self);
        let handler: MessageHandler = Arc::new(move |message: InboundMessage| {
            if let Some(inner) = weak.upgrade() {
                inner.on_message(message);
            }
        });
        *subscription = Some(self.listener.subscribe(self.messages.clone(), handler));
    }

    fn on_message(&self, message: InboundMessage) {
        let current_id = lock(&self.session).id().map(str::to_string);
        if let Some(update) = self.listener.accept(&message, current_id.as_deref()) {
            self.apply_status(update, Channel::Message);
        }
    }

    fn apply_status(&self, update: StatusUpdate, channel: Channel) {
        if self.is_torn_down() {
            return;
        }
        let Some(delivery) = lock(&self.session).resolve(&update.id, update.status) else {
            tracing::debug!(payment_id = %update.id, ?channel, "Status report absorbed");
            return;
        };

        tracing::info!(
            payment_id = %delivery.id,
            status = %update.status,
            ?channel,
            "Payment resolved"
        );
        self.unsubscribe();
        lock(&self.popup).close();
        self.busy.release();

        match update.status {
            TerminalStatus::Approved => self.callbacks.approved(&delivery.id, delivery.amount),
            TerminalStatus::Failed => self.report(&EngineError::PaymentFailed {
                payment_id: delivery.id,
            }),
        }
    }

    fn unsubscribe(&self) {
        let subscription = lock(&self.subscription).take();
        drop(subscription);
    }

    fn report(&self, error: &EngineError) {
        if error.is_terminal() {
            tracing::warn!(%error, "Payment session failed");
        } else {
            tracing::debug!(%error, "Reporting error");
        }
        self.callbacks.error(error);
    }

    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.unsubscribe();
        lock(&self.session).reset();
        lock(&self.popup).close();
        self.busy.release();
        tracing::debug!("Approval engine torn down");
    }
}
