//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use nimbus_handler::{
    DispatchContext, HandlerError, MulticastRequestHandler, RequestHandler,
};
use nimbus_message::{BusMessage, Envelope};
use nimbus_runtime::interceptor::{InboundInterceptor, InterceptorError, OutboundInterceptor};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Test messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub id: u64,
}

impl BusMessage for PlaceOrder {
    const TYPE_NAME: &'static str = "PlaceOrder";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub id: u64,
}

impl BusMessage for OrderPlaced {
    const TYPE_NAME: &'static str = "OrderPlaced";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping;

impl BusMessage for Ping {
    const TYPE_NAME: &'static str = "Ping";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pong {
    pub ts: u64,
}

impl BusMessage for Pong {
    const TYPE_NAME: &'static str = "Pong";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Census;

impl BusMessage for Census {
    const TYPE_NAME: &'static str = "Census";
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CensusReply {
    pub name: String,
}

impl BusMessage for CensusReply {
    const TYPE_NAME: &'static str = "CensusReply";
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Replies with a fixed pong.
pub struct PingHandler;

#[async_trait]
impl RequestHandler for PingHandler {
    type Request = Ping;
    type Response = Pong;

    async fn handle(&self, _: Ping, _: &DispatchContext) -> Result<Pong, HandlerError> {
        Ok(Pong { ts: 42 })
    }
}

/// A request handler that always fails.
pub struct FailingPingHandler;

#[async_trait]
impl RequestHandler for FailingPingHandler {
    type Request = Ping;
    type Response = Pong;

    async fn handle(&self, _: Ping, _: &DispatchContext) -> Result<Pong, HandlerError> {
        Err(HandlerError::failed("ping exploded"))
    }
}

/// Multicast census participant answering with its name.
pub struct CensusHandler {
    pub name: &'static str,
}

#[async_trait]
impl MulticastRequestHandler for CensusHandler {
    type Request = Census;
    type Response = CensusReply;

    async fn handle(&self, _: Census, _: &DispatchContext) -> Result<CensusReply, HandlerError> {
        Ok(CensusReply {
            name: self.name.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Hook recording
// ---------------------------------------------------------------------------

/// Shared hook invocation log.
pub type HookLog = Arc<Mutex<Vec<String>>>;

/// Outbound interceptor that records every hook it runs.
pub struct OutboundRecorder {
    pub name: &'static str,
    pub priority: i32,
    pub log: HookLog,
}

#[async_trait]
impl OutboundInterceptor for OutboundRecorder {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn on_sending(&self, _envelope: &mut Envelope) -> Result<(), InterceptorError> {
        self.log.lock().push(format!("sending:{}", self.name));
        Ok(())
    }

    async fn on_sent(&self, _envelope: &Envelope) {
        self.log.lock().push(format!("sent:{}", self.name));
    }

    async fn on_request_sending(&self, _envelope: &mut Envelope) -> Result<(), InterceptorError> {
        self.log.lock().push(format!("request_sending:{}", self.name));
        Ok(())
    }

    async fn on_request_sent(&self, _envelope: &Envelope) {
        self.log.lock().push(format!("request_sent:{}", self.name));
    }
}

/// Inbound interceptor that records every hook it runs.
pub struct InboundRecorder {
    pub name: &'static str,
    pub priority: i32,
    pub log: HookLog,
}

#[async_trait]
impl InboundInterceptor for InboundRecorder {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn on_handling(
        &self,
        _envelope: &Envelope,
        _ctx: &DispatchContext,
    ) -> Result<(), InterceptorError> {
        self.log.lock().push(format!("handling:{}", self.name));
        Ok(())
    }

    async fn on_handled(&self, _envelope: &Envelope, _ctx: &DispatchContext) {
        self.log.lock().push(format!("handled:{}", self.name));
    }

    async fn on_error(
        &self,
        _envelope: &Envelope,
        _ctx: &DispatchContext,
        _error: &nimbus_runtime::DispatchError,
    ) {
        self.log.lock().push(format!("error:{}", self.name));
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Polls a condition until it holds or two seconds elapse.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
