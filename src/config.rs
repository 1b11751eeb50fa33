use crate::domain::message::{AllowedOrigin, DEFAULT_MESSAGE_TYPE};
use crate::domain::validator::{DEFAULT_MIN_AMOUNT, Validator};
use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Engine configuration, usually read from a TOML file.
///
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the remote payment service API.
    pub api_base_url: String,
    /// Base URL of the approval page. Its origin is the only one approval
    /// messages are accepted from.
    pub popup_base_url: String,
    pub api_key: Option<String>,
    pub popup_width: u32,
    pub popup_height: u32,
    pub min_amount: Decimal,
    pub max_amount: Option<Decimal>,
    /// Type tag approval messages must carry.
    pub message_type: String,
    pub request_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.adeypay.com/v1".to_string(),
            popup_base_url: "https://pay.adeypay.com/approve".to_string(),
            api_key: None,
            popup_width: 480,
            popup_height: 720,
            min_amount: DEFAULT_MIN_AMOUNT,
            max_amount: None,
            message_type: DEFAULT_MESSAGE_TYPE.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_amount <= Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "min_amount must be greater than zero".to_string(),
            ));
        }
        if let Some(max) = self.max_amount
            && max < self.min_amount
        {
            return Err(ConfigError::Invalid(format!(
                "max_amount {max} is below min_amount {}",
                self.min_amount
            )));
        }
        if self.popup_width == 0 || self.popup_height == 0 {
            return Err(ConfigError::Invalid(
                "popup dimensions must be non-zero".to_string(),
            ));
        }
        if self.message_type.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "message_type must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validator(&self) -> Validator {
        Validator::new(self.min_amount, self.max_amount)
    }

    /// Derives the accepted message origin from `popup_base_url`.
    ///
    /// A base URL without a usable origin disables the origin check rather
    /// than rejecting every message.
    pub fn allowed_origin(&self) -> AllowedOrigin {
        let origin = AllowedOrigin::from_base_url(&self.popup_base_url);
        if origin.is_relaxed() {
            tracing::warn!(
                base_url = %self.popup_base_url,
                "Popup base URL has no origin; accepting approval messages from any origin"
            );
        }
        origin
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
