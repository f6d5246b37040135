//! Command dispatch scenarios.

mod common;

use common::{wait_until, PlaceOrder};
use nimbus_handler::testing::{DispatchRecorder, RecordingCommandHandler};
use nimbus_handler::HandlerRegistryBuilder;
use nimbus_runtime::{BusBuilder, BusError};
use nimbus_types::ErrorCode;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread")]
async fn send_invokes_the_handler_exactly_once() {
    let recorder = Arc::new(DispatchRecorder::new());
    let registry = HandlerRegistryBuilder::new()
        .handle_command({
            let recorder = Arc::clone(&recorder);
            move |_| RecordingCommandHandler::<PlaceOrder>::new(Arc::clone(&recorder))
        })
        .build()
        .unwrap();

    let bus = BusBuilder::new("orders", "orders-1")
        .with_registry(registry)
        .start()
        .await
        .unwrap();

    bus.send(&PlaceOrder { id: 7 }).await.unwrap();

    assert!(wait_until(|| recorder.count() == 1).await);
    let records = recorder.records();
    assert_eq!(records[0].message_type, "PlaceOrder");
    assert_eq!(records[0].payload["id"], 7);

    // No further invocations arrive after quiescence.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(recorder.count(), 1);

    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn two_sends_carry_distinct_message_ids() {
    let recorder = Arc::new(DispatchRecorder::new());
    let registry = HandlerRegistryBuilder::new()
        .handle_command({
            let recorder = Arc::clone(&recorder);
            move |_| RecordingCommandHandler::<PlaceOrder>::new(Arc::clone(&recorder))
        })
        .build()
        .unwrap();

    let bus = BusBuilder::new("orders", "orders-1")
        .with_registry(registry)
        .start()
        .await
        .unwrap();

    bus.send(&PlaceOrder { id: 7 }).await.unwrap();
    bus.send(&PlaceOrder { id: 7 }).await.unwrap();

    assert!(wait_until(|| recorder.count() == 2).await);
    let records = recorder.records();
    assert_ne!(records[0].message_id, records[1].message_id);

    bus.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn unregistered_message_types_are_refused() {
    let bus = BusBuilder::new("orders", "orders-1").start().await.unwrap();

    let err = bus.send(&PlaceOrder { id: 1 }).await.unwrap_err();
    assert_eq!(err.code(), "BUS_UNKNOWN_MESSAGE_TYPE");
    assert!(matches!(err, BusError::UnknownMessageType(t) if t == "PlaceOrder"));

    bus.shutdown().await;
}
