#![allow(dead_code)]

use adeypay_engine::application::engine::{ApprovalEngine, HostCapabilities};
use adeypay_engine::application::notify::Callbacks;
use adeypay_engine::config::EngineConfig;
use adeypay_engine::domain::message::InboundMessage;
use adeypay_engine::domain::request::{PayloadSource, PaymentPayload};
use adeypay_engine::error::EngineError;
use adeypay_engine::infrastructure::in_memory::{
    InMemoryMessageBus, InMemoryWindowHost, ScriptedGateway,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::{Arc, Mutex};

pub const ORIGIN: &str = "https://pay.adeypay.com";

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Created(String, Decimal),
    Approved(String, Decimal),
    Error(EngineError),
    Busy(bool),
}

/// Collects every callback the engine fires, in order.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn callbacks(&self) -> Callbacks {
        let (c, a, e, b) = (
            self.events.clone(),
            self.events.clone(),
            self.events.clone(),
            self.events.clone(),
        );
        Callbacks::new()
            .on_created(move |id, amount| {
                c.lock()
                    .unwrap()
                    .push(Event::Created(id.to_string(), amount.value()))
            })
            .on_approved(move |id, amount| {
                a.lock()
                    .unwrap()
                    .push(Event::Approved(id.to_string(), amount.value()))
            })
            .on_error(move |err| e.lock().unwrap().push(Event::Error(err.clone())))
            .on_busy_change(move |busy| b.lock().unwrap().push(Event::Busy(busy)))
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    /// Events without busy-indicator edges.
    pub fn outcomes(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Busy(_)))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

pub struct Harness {
    pub engine: ApprovalEngine,
    pub gateway: ScriptedGateway,
    pub windows: Arc<InMemoryWindowHost>,
    pub bus: Arc<InMemoryMessageBus>,
    pub recorder: Recorder,
}

pub fn harness_with(
    config: EngineConfig,
    windows: InMemoryWindowHost,
    payload: PayloadSource,
) -> Harness {
    let gateway = ScriptedGateway::new();
    let windows = Arc::new(windows);
    let bus = Arc::new(InMemoryMessageBus::new());
    let recorder = Recorder::default();
    let engine = ApprovalEngine::new(
        &config,
        Box::new(gateway.clone()),
        HostCapabilities {
            windows: windows.clone(),
            messages: bus.clone(),
        },
        payload,
        recorder.callbacks(),
    );
    Harness {
        engine,
        gateway,
        windows,
        bus,
        recorder,
    }
}

pub fn harness() -> Harness {
    harness_with(
        EngineConfig {
            api_key: Some("sk_test".to_string()),
            ..EngineConfig::default()
        },
        InMemoryWindowHost::new(),
        PayloadSource::Fixed(PaymentPayload::new(10.0, "a@b.com")),
    )
}

pub fn status_message(origin: &str, id: Option<&str>, status: &str) -> InboundMessage {
    let data = match id {
        Some(id) => json!({"type": "ADEYPAY_PAYMENT", "paymentId": id, "status": status}),
        None => json!({"type": "ADEYPAY_PAYMENT", "status": status}),
    };
    InboundMessage::new(origin, data)
}
