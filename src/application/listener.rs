use crate::domain::message::{
    AllowedOrigin, InboundMessage, ProtocolMessage, StatusUpdate, TerminalStatus,
};
use crate::domain::ports::{MessageBus, MessageHandler, SubscriptionId};
use std::sync::Arc;

/// Filters cross-window messages down to status updates for the current session.
#[derive(Debug, Clone)]
pub struct MessageChannelListener {
    allowed_origin: AllowedOrigin,
    message_type: String,
}

impl MessageChannelListener {
    pub fn new(allowed_origin: AllowedOrigin, message_type: impl Into<String>) -> Self {
        Self {
            allowed_origin,
            message_type: message_type.into(),
        }
    }

    /// Returns the status update carried by `message`, or `None` if the message
    /// is foreign, malformed, or about a subject other than `current_id`.
    ///
    /// A message without a `paymentId` is taken to be about the current subject.
    pub fn accept(
        &self,
        message: &InboundMessage,
        current_id: Option<&str>,
    ) -> Option<StatusUpdate> {
        if !self.allowed_origin.permits(&message.origin) {
            tracing::debug!(origin = %message.origin, "Dropping message from foreign origin");
            return None;
        }

        let body = ProtocolMessage::parse(&message.data)?;
        if body.kind.as_deref() != Some(self.message_type.as_str()) {
            return None;
        }

        let current_id = current_id?;
        if let Some(subject) = body.payment_id.as_deref()
            && subject != current_id
        {
            tracing::debug!(subject, current_id, "Dropping message for stale subject");
            return None;
        }

        let status = body.status.as_deref()?.parse::<TerminalStatus>().ok()?;
        Some(StatusUpdate {
            id: current_id.to_string(),
            status,
        })
    }

    pub fn subscribe(&self, bus: Arc<dyn MessageBus>, handler: MessageHandler) -> Subscription {
        let id = bus.subscribe(handler);
        Subscription { bus, id }
    }
}

/// A live registration on the message bus. Unsubscribes when dropped.
pub struct Subscription {
    bus: Arc<dyn MessageBus>,
    id: SubscriptionId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}
