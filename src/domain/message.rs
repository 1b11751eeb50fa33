use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MESSAGE_TYPE: &str = "ADEYPAY_PAYMENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerminalStatus {
    Approved,
    Failed,
}

impl FromStr for TerminalStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(TerminalStatus::Approved),
            "failed" => Ok(TerminalStatus::Failed),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalStatus::Approved => f.write_str("approved"),
            TerminalStatus::Failed => f.write_str("failed"),
        }
    }
}

/// A raw cross-window message as delivered by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub origin: String,
    pub data: serde_json::Value,
}

impl InboundMessage {
    pub fn new(origin: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            origin: origin.into(),
            data,
        }
    }
}

/// The approval window's message body. Every field is optional on the wire;
/// anything that does not fit this shape is noise.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProtocolMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "paymentId")]
    pub payment_id: Option<String>,
    pub status: Option<String>,
}

impl ProtocolMessage {
    pub fn parse(data: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(data.clone()).ok()
    }
}

/// A terminal status report for a subject, from any channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub id: String,
    pub status: TerminalStatus,
}

/// The only origin approval messages are accepted from.
///
/// `None` when the popup base URL has no usable origin; the listener then
/// skips the origin check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowedOrigin(Option<String>);

impl AllowedOrigin {
    pub fn from_base_url(base_url: &str) -> Self {
        let origin = url::Url::parse(base_url)
            .ok()
            .map(|u| u.origin())
            .filter(|o| o.is_tuple())
            .map(|o| o.ascii_serialization());
        Self(origin)
    }

    pub fn any() -> Self {
        Self(None)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_relaxed(&self) -> bool {
        self.0.is_none()
    }

    pub fn permits(&self, origin: &str) -> bool {
        match &self.0 {
            Some(allowed) => allowed == origin,
            None => true,
        }
    }
}
