//! Lifecycle of a single payment or payout.
//!
//! ```text
//!   Idle ──begin──▶ Creating ──created──▶ Created ──resolve──▶ Approved
//!    ▲                 │                     │
//!    │                 └──failure──▶ Failed ◀┘
//!    └──── reset (teardown)
//! ```
//!
//! A terminal session may be replaced by calling `begin` again. All mutation goes
//! through the methods below, each of which checks the current state first, so
//! competing channels can call them in any order.

use super::amount::Amount;
use super::dedup::{DedupRegistry, DeliveryKey};
use super::message::TerminalStatus;
use super::request::ValidatedRequest;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Creating,
    Created,
    Approved,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Approved | SessionStatus::Failed)
    }

    /// Creating or Created: a request is in flight.
    pub fn is_live(self) -> bool {
        matches!(self, SessionStatus::Creating | SessionStatus::Created)
    }
}

/// Proof that the holder started the current creation attempt.
///
/// A create call that resolves after the session was reset or replaced holds a
/// stale ticket and its result is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// A callback the caller should receive, produced by a successful transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub id: String,
    pub amount: Amount,
}

#[derive(Debug, Default)]
pub struct PaymentSession {
    status: SessionStatus,
    id: Option<String>,
    request: Option<ValidatedRequest>,
    idempotency_key: Option<String>,
    generation: u64,
    dedup: DedupRegistry,
}

impl PaymentSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn request(&self) -> Option<&ValidatedRequest> {
        self.request.as_ref()
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Idle (or terminal) -> Creating.
    pub fn begin(
        &mut self,
        request: ValidatedRequest,
        idempotency_key: String,
    ) -> Result<Ticket, EngineError> {
        if self.status.is_live() {
            return Err(EngineError::SessionBusy);
        }
        self.generation += 1;
        self.status = SessionStatus::Creating;
        self.id = None;
        self.request = Some(request);
        self.idempotency_key = Some(idempotency_key);
        self.dedup.clear();
        Ok(Ticket(self.generation))
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation && self.status == SessionStatus::Creating
    }

    /// Creating -> Created. The id becomes permanent for this session.
    ///
    /// Returns the `created` delivery the first time only.
    pub fn record_created(&mut self, ticket: Ticket, id: String) -> Option<Delivery> {
        if !self.is_current(ticket) {
            return None;
        }
        let amount = self.request.as_ref()?.amount;
        self.status = SessionStatus::Created;
        self.id = Some(id.clone());
        self.dedup
            .claim(DeliveryKey::Created(id.clone()))
            .then_some(Delivery { id, amount })
    }

    /// Creating -> Failed. Returns `false` if the ticket is stale.
    pub fn record_creation_failure(&mut self, ticket: Ticket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.status = SessionStatus::Failed;
        true
    }

    /// Created -> Approved | Failed, on the first accepted status for the current id.
    ///
    /// Later or duplicate reports, reports for another id, and reports before the
    /// id is known all return `None` and leave the session untouched.
    pub fn resolve(&mut self, id: &str, status: TerminalStatus) -> Option<Delivery> {
        if self.status != SessionStatus::Created || self.id.as_deref() != Some(id) {
            return None;
        }
        let amount = self.request.as_ref()?.amount;
        if !self.dedup.claim(DeliveryKey::Status(id.to_string())) {
            return None;
        }
        self.status = match status {
            TerminalStatus::Approved => SessionStatus::Approved,
            TerminalStatus::Failed => SessionStatus::Failed,
        };
        Some(Delivery {
            id: id.to_string(),
            amount,
        })
    }

    /// Drops the session back to Idle and invalidates outstanding tickets.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.status = SessionStatus::Idle;
        self.id = None;
        self.request = None;
        self.idempotency_key = None;
        self.dedup.clear();
    }
}
