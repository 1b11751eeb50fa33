use super::amount::{Amount, RawAmount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The input values of one payment or payout request, as the host supplies them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentPayload {
    pub amount: Option<RawAmount>,
    /// Email address or account identifier.
    #[serde(alias = "email")]
    pub recipient: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl PaymentPayload {
    pub fn new(amount: impl Into<RawAmount>, recipient: impl Into<String>) -> Self {
        Self {
            amount: Some(amount.into()),
            recipient: Some(recipient.into()),
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

pub type PayloadAccessor = Arc<dyn Fn() -> Option<PaymentPayload> + Send + Sync>;

/// Where the engine gets its request values from.
///
/// `Accessor` is called lazily, once per request attempt, so hosts can read
/// their current input fields at click time.
#[derive(Clone)]
pub enum PayloadSource {
    Fixed(PaymentPayload),
    Accessor(PayloadAccessor),
    None,
}

impl PayloadSource {
    pub fn accessor<F>(f: F) -> Self
    where
        F: Fn() -> Option<PaymentPayload> + Send + Sync + 'static,
    {
        Self::Accessor(Arc::new(f))
    }

    pub fn resolve(&self) -> Option<PaymentPayload> {
        match self {
            PayloadSource::Fixed(payload) => Some(payload.clone()),
            PayloadSource::Accessor(accessor) => accessor(),
            PayloadSource::None => None,
        }
    }
}

impl fmt::Debug for PayloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadSource::Fixed(payload) => f.debug_tuple("Fixed").field(payload).finish(),
            PayloadSource::Accessor(_) => f.write_str("Accessor(..)"),
            PayloadSource::None => f.write_str("None"),
        }
    }
}

/// A request that passed validation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub amount: Amount,
    pub recipient: String,
    pub note: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_payload_accepts_email_alias() {
        let payload: PaymentPayload =
            serde_json::from_str(r#"{"amount": 10, "email": "a@b.com"}"#).unwrap();
        assert_eq!(payload.recipient.as_deref(), Some("a@b.com"));
        assert_eq!(payload.amount, Some(RawAmount::Number(10.0)));
        assert_eq!(payload.note, None);
    }

    #[test]
    fn test_accessor_is_called_per_resolve() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let source = PayloadSource::accessor(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(PaymentPayload::new(10.0, "a@b.com"))
        });

        assert!(source.resolve().is_some());
        assert!(source.resolve().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_empty_source_resolves_to_nothing() {
        assert!(PayloadSource::None.resolve().is_none());
        assert!(PayloadSource::accessor(|| None).resolve().is_none());
    }
}
