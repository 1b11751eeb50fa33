//! Application layer orchestrating the payment and payout flows.
//!
//! `ApprovalEngine` drives a payment through creation, the approval popup and the
//! race between the message channel and the status poller. `PayoutEngine` runs the
//! simpler payout flow, which is approved as soon as it is created.

pub mod engine;
pub mod listener;
pub mod notify;
pub mod popup;
pub mod withdraw;

use crate::domain::session::{Delivery, PaymentSession, Ticket};
use crate::domain::ports::CreateResponse;
use crate::error::{CreationError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks `mutex`, recovering the data if a callback panicked while it was held.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Applies the outcome of a create call to the session that issued `ticket`.
///
/// `Ok(None)` means there is nothing to report: the ticket went stale while the
/// call was in flight, or the `created` event was already delivered.
pub(crate) fn record_creation(
    session: &mut PaymentSession,
    ticket: Ticket,
    result: std::result::Result<CreateResponse, CreationError>,
) -> Result<Option<Delivery>> {
    if !session.is_current(ticket) {
        tracing::debug!(
            generation = session.generation(),
            "Discarding create response for a stale session"
        );
        return Ok(None);
    }

    let id = result.and_then(|response| {
        response
            .identifier()
            .map(str::to_string)
            .ok_or(CreationError::NoIdentifierReturned)
    });

    match id {
        Ok(id) => Ok(session.record_created(ticket, id)),
        Err(e) => {
            session.record_creation_failure(ticket);
            Err(e.into())
        }
    }
}
