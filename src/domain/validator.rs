use super::amount::Amount;
use super::request::{PaymentPayload, ValidatedRequest};
use crate::error::ValidationError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_MIN_AMOUNT: Decimal = dec!(5);

/// Checks a payload against amount bounds and recipient presence.
///
/// Rules are applied in a fixed order and the first failure wins. Validation
/// is pure: no network, no state.
#[derive(Debug, Clone, PartialEq)]
pub struct Validator {
    min_amount: Decimal,
    max_amount: Option<Decimal>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_AMOUNT, None)
    }
}

impl Validator {
    pub fn new(min_amount: Decimal, max_amount: Option<Decimal>) -> Self {
        Self {
            min_amount,
            max_amount,
        }
    }

    pub fn validate(
        &self,
        payload: Option<&PaymentPayload>,
    ) -> Result<ValidatedRequest, ValidationError> {
        let payload = payload.ok_or(ValidationError::MissingPayload)?;

        let raw = payload
            .amount
            .as_ref()
            .ok_or(ValidationError::InvalidAmount)?;
        let amount = Amount::new(raw.to_decimal()?)?;

        if amount.value() < self.min_amount {
            return Err(ValidationError::BelowMinimum {
                amount: amount.value(),
                minimum: self.min_amount,
            });
        }

        if let Some(maximum) = self.max_amount
            && amount.value() > maximum
        {
            return Err(ValidationError::AboveMaximum {
                amount: amount.value(),
                maximum,
            });
        }

        let recipient = payload
            .recipient
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(ValidationError::MissingRecipient)?;

        Ok(ValidatedRequest {
            amount,
            recipient: recipient.to_string(),
            note: payload
                .note
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        })
    }
}
