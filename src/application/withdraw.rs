use super::notify::{BusyIndicator, Callbacks};
use super::{lock, record_creation};
use crate::config::EngineConfig;
use crate::domain::idempotency::IdempotencyKeyGenerator;
use crate::domain::message::TerminalStatus;
use crate::domain::ports::{CreateRequest, GatewayBox};
use crate::domain::request::PayloadSource;
use crate::domain::session::{PaymentSession, SessionStatus};
use crate::domain::validator::Validator;
use crate::error::Result;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs payouts. There is no approval step: a payout the remote service
/// created is reported as created and then approved, in that order.
pub struct PayoutEngine {
    validator: Validator,
    keys: IdempotencyKeyGenerator,
    gateway: GatewayBox,
    api_key: Option<String>,
    payload: PayloadSource,
    session: Mutex<PaymentSession>,
    callbacks: Callbacks,
    busy: BusyIndicator,
    torn_down: AtomicBool,
}

impl PayoutEngine {
    pub fn new(
        config: &EngineConfig,
        gateway: GatewayBox,
        payload: PayloadSource,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            validator: config.validator(),
            keys: IdempotencyKeyGenerator::new(),
            gateway,
            api_key: config.api_key.clone(),
            payload,
            session: Mutex::new(PaymentSession::new()),
            busy: BusyIndicator::new(&callbacks),
            callbacks,
            torn_down: AtomicBool::new(false),
        }
    }

    pub async fn withdraw(&self) {
        if let Err(e) = self.try_withdraw().await {
            if e.is_terminal() {
                tracing::warn!(error = %e, "Payout failed");
            }
            self.callbacks.error(&e);
        }
    }

    async fn try_withdraw(&self) -> Result<()> {
        if self.torn_down.load(Ordering::SeqCst) {
            return Ok(());
        }

        let request = self.validator.validate(self.payload.resolve().as_ref())?;
        let idempotency_key = self.keys.generate();
        let ticket = lock(&self.session).begin(request.clone(), idempotency_key.clone())?;
        let _busy = self.busy.hold();

        tracing::info!(amount = %request.amount, "Creating payout");
        let result = self
            .gateway
            .create_payout(&CreateRequest {
                amount: request.amount,
                recipient: request.recipient,
                note: request.note,
                api_key: self.api_key.clone(),
                idempotency_key,
            })
            .await;

        let (created, approved) = {
            let mut session = lock(&self.session);
            if self.torn_down.load(Ordering::SeqCst) {
                return Ok(());
            }
            let Some(created) = record_creation(&mut session, ticket, result)? else {
                return Ok(());
            };
            let approved = session.resolve(&created.id, TerminalStatus::Approved);
            (created, approved)
        };

        tracing::info!(payout_id = %created.id, "Payout created");
        self.callbacks.created(&created.id, created.amount);
        if let Some(approved) = approved {
            self.callbacks.approved(&approved.id, approved.amount);
        }
        Ok(())
    }

    /// Resets the session. A payout call still in flight is discarded on arrival.
    pub fn teardown(&self) {
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            lock(&self.session).reset();
            self.busy.release();
        }
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.session).status()
    }

    pub fn payout_id(&self) -> Option<String> {
        lock(&self.session).id().map(str::to_string)
    }

    pub fn idempotency_key(&self) -> Option<String> {
        lock(&self.session).idempotency_key().map(str::to_string)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }
}

impl Drop for PayoutEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}
