use rust_decimal::Decimal;
use thiserror::Error;

/// Local rejections raised before any network call is made.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("no payment payload was provided")]
    MissingPayload,
    #[error("amount must be a finite number greater than zero")]
    InvalidAmount,
    #[error("amount {amount} is below the minimum of {minimum}")]
    BelowMinimum { amount: Decimal, minimum: Decimal },
    #[error("amount {amount} is above the maximum of {maximum}")]
    AboveMaximum { amount: Decimal, maximum: Decimal },
    #[error("recipient must be a non-empty email or account")]
    MissingRecipient,
}

/// Failures of the remote create call. These terminate the session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CreationError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("remote service rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("remote service did not return an identifier")]
    NoIdentifierReturned,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("creation error: {0}")]
    Creation(#[from] CreationError),
    #[error("approval window for {payment_id} was blocked")]
    PopupBlocked { payment_id: String },
    #[error("payment {payment_id} failed")]
    PaymentFailed { payment_id: String },
    #[error("a payment session is already in progress")]
    SessionBusy,
}

impl EngineError {
    /// Whether this error ends the session in the `Failed` state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Creation(_) | Self::PaymentFailed { .. })
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
