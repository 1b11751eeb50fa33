mod common;

use adeypay_engine::config::EngineConfig;
use adeypay_engine::domain::message::TerminalStatus;
use adeypay_engine::domain::ports::CreateResponse;
use adeypay_engine::domain::request::{PayloadSource, PaymentPayload};
use adeypay_engine::domain::session::SessionStatus;
use adeypay_engine::error::{CreationError, EngineError};
use adeypay_engine::infrastructure::in_memory::{CallKind, InMemoryWindowHost};
use common::{Event, ORIGIN, harness, harness_with, status_message};
use rust_decimal_macros::dec;
use std::sync::Arc;

#[tokio::test]
async fn test_message_approval_fires_once_and_closes_popup() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));

    h.engine.start_payment().await;
    assert_eq!(
        h.windows.opened()[0].0,
        "https://pay.adeypay.com/approve/pay_9"
    );
    assert_eq!(h.windows.open_count(), 1);

    h.bus
        .dispatch(status_message(ORIGIN, Some("pay_9"), "approved"));

    assert_eq!(
        h.recorder.outcomes(),
        vec![
            Event::Created("pay_9".to_string(), dec!(10)),
            Event::Approved("pay_9".to_string(), dec!(10)),
        ]
    );
    assert_eq!(h.windows.open_count(), 0);
    assert_eq!(h.engine.status(), SessionStatus::Approved);

    let calls = h.gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, CallKind::Payment);
    assert_eq!(calls[0].request.api_key.as_deref(), Some("sk_test"));
}

#[tokio::test]
async fn test_duplicate_messages_produce_one_callback() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));
    h.engine.start_payment().await;

    for _ in 0..3 {
        h.bus
            .dispatch(status_message(ORIGIN, Some("pay_9"), "approved"));
    }

    assert_eq!(h.recorder.count(|e| matches!(e, Event::Approved(..))), 1);
}

#[tokio::test]
async fn test_message_and_poller_race_yields_one_approval() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));
    h.engine.start_payment().await;

    h.engine.report_status("pay_9", TerminalStatus::Approved);
    h.bus
        .dispatch(status_message(ORIGIN, Some("pay_9"), "approved"));
    h.engine.report_status("pay_9", TerminalStatus::Approved);

    assert_eq!(h.recorder.count(|e| matches!(e, Event::Approved(..))), 1);
    assert_eq!(h.recorder.count(|e| matches!(e, Event::Error(_))), 0);
}

#[tokio::test]
async fn test_first_terminal_status_wins() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));
    h.engine.start_payment().await;

    h.bus.dispatch(status_message(ORIGIN, Some("pay_9"), "failed"));
    h.engine.report_status("pay_9", TerminalStatus::Approved);

    assert_eq!(h.engine.status(), SessionStatus::Failed);
    assert_eq!(
        h.recorder.outcomes(),
        vec![
            Event::Created("pay_9".to_string(), dec!(10)),
            Event::Error(EngineError::PaymentFailed {
                payment_id: "pay_9".to_string()
            }),
        ]
    );
}

#[tokio::test]
async fn test_foreign_origin_and_stale_subject_do_not_mutate() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));
    h.engine.start_payment().await;

    h.bus.dispatch(status_message(
        "https://evil.example",
        Some("pay_9"),
        "approved",
    ));
    h.bus
        .dispatch(status_message(ORIGIN, Some("pay_8"), "approved"));
    h.engine.report_status("pay_8", TerminalStatus::Failed);

    assert_eq!(h.engine.status(), SessionStatus::Created);
    assert_eq!(h.windows.open_count(), 1);
    assert_eq!(
        h.recorder.outcomes(),
        vec![Event::Created("pay_9".to_string(), dec!(10))]
    );
}

#[tokio::test]
async fn test_blocked_popup_still_approved_by_poller() {
    let h = harness_with(
        EngineConfig::default(),
        InMemoryWindowHost::blocking(),
        PayloadSource::Fixed(PaymentPayload::new(10.0, "a@b.com")),
    );
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));

    h.engine.start_payment().await;
    assert_eq!(h.engine.status(), SessionStatus::Created);
    assert!(!h.engine.is_busy());

    h.engine
        .status_reporter()
        .report("pay_9", TerminalStatus::Approved);

    assert_eq!(
        h.recorder.outcomes(),
        vec![
            Event::Created("pay_9".to_string(), dec!(10)),
            Event::Error(EngineError::PopupBlocked {
                payment_id: "pay_9".to_string()
            }),
            Event::Approved("pay_9".to_string(), dec!(10)),
        ]
    );
}

#[tokio::test]
async fn test_busy_held_until_terminal() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));

    h.engine.start_payment().await;
    assert!(h.engine.is_busy());

    h.engine.report_status("pay_9", TerminalStatus::Approved);
    assert!(!h.engine.is_busy());
    assert_eq!(
        h.recorder
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Busy(_)))
            .collect::<Vec<_>>(),
        vec![Event::Busy(true), Event::Busy(false)]
    );
}

#[tokio::test]
async fn test_transport_failure_releases_busy() {
    let h = harness();
    h.gateway
        .push_response(Err(CreationError::Transport("timed out".to_string())));

    h.engine.start_payment().await;

    assert_eq!(h.engine.status(), SessionStatus::Failed);
    assert!(!h.engine.is_busy());
    assert_eq!(
        h.recorder.events(),
        vec![
            Event::Busy(true),
            Event::Busy(false),
            Event::Error(EngineError::Creation(CreationError::Transport(
                "timed out".to_string()
            ))),
        ]
    );
    assert_eq!(h.windows.opened().len(), 0);
}

#[tokio::test]
async fn test_terminal_session_can_start_again_with_new_key() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_1")));
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_2")));

    h.engine.start_payment().await;
    h.engine.report_status("pay_1", TerminalStatus::Failed);
    h.engine.start_payment().await;

    assert_eq!(h.engine.payment_id().as_deref(), Some("pay_2"));
    let calls = h.gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_ne!(
        calls[0].request.idempotency_key,
        calls[1].request.idempotency_key
    );

    // The previous session's id is stale now.
    h.bus
        .dispatch(status_message(ORIGIN, Some("pay_1"), "approved"));
    assert_eq!(h.engine.status(), SessionStatus::Created);
}

#[tokio::test]
async fn test_teardown_discards_in_flight_creation() {
    let h = harness();
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));
    let gate = h.gateway.gate();

    let engine = Arc::new(h.engine);
    let pending = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.start_payment().await })
    };

    h.gateway.call_started().await;
    assert_eq!(engine.status(), SessionStatus::Creating);
    engine.teardown();
    assert_eq!(h.bus.subscriber_count(), 0);

    gate.notify_one();
    pending.await.unwrap();

    assert_eq!(engine.status(), SessionStatus::Idle);
    assert_eq!(h.windows.opened().len(), 0);
    assert_eq!(
        h.recorder.outcomes(),
        Vec::<Event>::new(),
        "no callbacks after teardown"
    );
    assert!(!engine.is_busy());
}

#[tokio::test]
async fn test_accessor_read_at_click_time() {
    let amount = Arc::new(std::sync::Mutex::new("3".to_string()));
    let source_amount = amount.clone();
    let h = harness_with(
        EngineConfig::default(),
        InMemoryWindowHost::new(),
        PayloadSource::accessor(move || {
            Some(PaymentPayload::new(
                source_amount.lock().unwrap().as_str(),
                "a@b.com",
            ))
        }),
    );
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_3")));

    h.engine.start_payment().await;
    assert!(h.gateway.calls().is_empty());

    *amount.lock().unwrap() = "12.50".to_string();
    h.engine.start_payment().await;

    let calls = h.gateway.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].request.amount.value(), dec!(12.50));
    assert_eq!(h.engine.payment_id().as_deref(), Some("pay_3"));
}

#[tokio::test]
async fn test_relaxed_origin_mode() {
    let h = harness_with(
        EngineConfig {
            popup_base_url: "/approve".to_string(),
            ..EngineConfig::default()
        },
        InMemoryWindowHost::new(),
        PayloadSource::Fixed(PaymentPayload::new(10.0, "a@b.com")),
    );
    h.gateway.push_response(Ok(CreateResponse::with_id("pay_9")));
    h.engine.start_payment().await;
    assert_eq!(h.windows.opened()[0].0, "/approve/pay_9");

    h.bus.dispatch(status_message(
        "https://anywhere.example",
        None,
        "approved",
    ));
    assert_eq!(h.engine.status(), SessionStatus::Approved);
}
