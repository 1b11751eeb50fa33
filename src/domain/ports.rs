use super::amount::Amount;
use super::message::InboundMessage;
use crate::error::CreationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a create-payment or create-payout call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateRequest {
    pub amount: Amount,
    #[serde(rename = "email")]
    pub recipient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip)]
    pub api_key: Option<String>,
    #[serde(skip)]
    pub idempotency_key: String,
}

/// What the remote service returns from a create call.
///
/// Payouts have been seen answering with `payoutId` and payments with `id`;
/// both are accepted, `payoutId` first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CreateResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "payoutId")]
    pub payout_id: Option<String>,
}

impl CreateResponse {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            payout_id: None,
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        non_empty(&self.payout_id).or_else(|| non_empty(&self.id))
    }
}

fn non_empty(id: &Option<String>) -> Option<&str> {
    id.as_deref().filter(|id| !id.is_empty())
}

/// The remote payment service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, request: &CreateRequest)
    -> Result<CreateResponse, CreationError>;
    async fn create_payout(&self, request: &CreateRequest) -> Result<CreateResponse, CreationError>;
}

pub type GatewayBox = Box<dyn PaymentGateway>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Window features requested when opening the approval popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Centers a `width` x `height` window on `screen`, clamped to the top-left corner.
    pub fn centered(screen: ScreenSize, width: u32, height: u32) -> Self {
        Self {
            left: screen.width.saturating_sub(width) / 2,
            top: screen.height.saturating_sub(height) / 2,
            width,
            height,
        }
    }

    pub fn features(&self) -> String {
        format!(
            "width={},height={},left={},top={}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Window control offered by the host runtime.
pub trait WindowHost: Send + Sync {
    fn screen_size(&self) -> ScreenSize;
    /// Returns `None` when the host refuses to open the window.
    fn open(&self, url: &str, placement: Placement) -> Option<WindowHandle>;
    /// Closing an already closed window is a no-op.
    fn close(&self, handle: WindowHandle);
    fn focus(&self, handle: WindowHandle);
    fn is_closed(&self, handle: WindowHandle) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

pub type MessageHandler = Arc<dyn Fn(InboundMessage) + Send + Sync>;

/// The ambient cross-window message channel.
pub trait MessageBus: Send + Sync {
    fn subscribe(&self, handler: MessageHandler) -> SubscriptionId;
    fn unsubscribe(&self, id: SubscriptionId);
}
