//! Multicast request: all handlers may reply, the caller collects the
//! window.

mod common;

use common::{Census, CensusHandler, CensusReply};
use nimbus_handler::HandlerRegistryBuilder;
use nimbus_runtime::transport::{InMemoryTransport, Transport};
use nimbus_runtime::BusBuilder;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread")]
async fn collects_every_reply_inside_the_window() {
    let transport: Arc<dyn Transport> = Arc::new(InMemoryTransport::new());

    let server = BusBuilder::new("census", "server-1")
        .with_registry(
            HandlerRegistryBuilder::new()
                .handle_multicast_request(|_| CensusHandler { name: "A" })
                .handle_multicast_request(|_| CensusHandler { name: "B" })
                .build()
                .unwrap(),
        )
        .with_transport(Arc::clone(&transport))
        .start()
        .await
        .unwrap();

    let client = BusBuilder::new("census", "client-1")
        .with_registry(
            HandlerRegistryBuilder::new()
                .declare_event::<Census>()
                .build()
                .unwrap(),
        )
        .with_transport(Arc::clone(&transport))
        .start()
        .await
        .unwrap();

    let mut replies: Vec<CensusReply> = client
        .multicast_request(&Census, Duration::from_millis(500))
        .await
        .unwrap();
    replies.sort();

    assert_eq!(
        replies,
        vec![
            CensusReply { name: "A".into() },
            CensusReply { name: "B".into() },
        ]
    );

    client.shutdown().await;
    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_window_yields_no_replies() {
    let client = BusBuilder::new("census", "client-1")
        .with_registry(
            HandlerRegistryBuilder::new()
                .declare_event::<Census>()
                .build()
                .unwrap(),
        )
        .start()
        .await
        .unwrap();

    let replies: Vec<CensusReply> = client
        .multicast_request(&Census, Duration::from_millis(200))
        .await
        .unwrap();
    assert!(replies.is_empty());

    client.shutdown().await;
}
