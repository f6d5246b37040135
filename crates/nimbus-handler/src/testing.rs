//! Typed recorders for handler test doubles.
//!
//! Test doubles record what the bus delivered to them through a plain,
//! typed interface: a [`DispatchRecorder`] shared between the test and the
//! recording handlers, inspected after the scenario runs. No call
//! interception, no reflection.
//!
//! # Example
//!
//! ```ignore
//! let recorder = Arc::new(DispatchRecorder::new());
//!
//! let registry = HandlerRegistryBuilder::new()
//!     .handle_command({
//!         let recorder = Arc::clone(&recorder);
//!         move |_| RecordingCommandHandler::<PlaceOrder>::new(Arc::clone(&recorder))
//!     })
//!     .build()?;
//!
//! // ... run the scenario ...
//!
//! assert_eq!(recorder.count_of("PlaceOrder"), 1);
//! ```

use crate::context::DispatchContext;
use crate::error::HandlerError;
use crate::traits::{CommandHandler, CompetingEventHandler, MulticastEventHandler};
use async_trait::async_trait;
use nimbus_message::BusMessage;
use nimbus_types::{CorrelationId, MessageId};
use parking_lot::Mutex;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// One recorded handler invocation.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    /// Canonical name of the dispatched message type.
    pub message_type: String,
    /// Id of the dispatched message.
    pub message_id: MessageId,
    /// Correlation id, when present.
    pub correlation_id: Option<CorrelationId>,
    /// Delivery attempt at the time of the invocation.
    pub delivery_attempt: u32,
    /// The payload the handler received, re-serialized.
    pub payload: Value,
}

/// Collects [`DispatchRecord`]s from recording handlers.
#[derive(Debug, Default)]
pub struct DispatchRecorder {
    records: Mutex<Vec<DispatchRecord>>,
}

impl DispatchRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record. Called by recording handlers.
    pub fn record(&self, message_type: &str, ctx: &DispatchContext, payload: Value) {
        self.records.lock().push(DispatchRecord {
            message_type: message_type.to_string(),
            message_id: ctx.message_id,
            correlation_id: ctx.correlation_id,
            delivery_attempt: ctx.delivery_attempt,
            payload,
        });
    }

    /// Returns a snapshot of all records, in invocation order.
    #[must_use]
    pub fn records(&self) -> Vec<DispatchRecord> {
        self.records.lock().clone()
    }

    /// Total number of recorded invocations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.records.lock().len()
    }

    /// Number of invocations for one message type.
    #[must_use]
    pub fn count_of(&self, message_type: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.message_type == message_type)
            .count()
    }
}

/// A command handler that records every invocation, optionally failing.
pub struct RecordingCommandHandler<M> {
    recorder: Arc<DispatchRecorder>,
    fail_with: Option<String>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> RecordingCommandHandler<M> {
    /// Creates a handler that records and succeeds.
    #[must_use]
    pub fn new(recorder: Arc<DispatchRecorder>) -> Self {
        Self {
            recorder,
            fail_with: None,
            _marker: PhantomData,
        }
    }

    /// Creates a handler that records and then fails with the message.
    #[must_use]
    pub fn failing(recorder: Arc<DispatchRecorder>, message: impl Into<String>) -> Self {
        Self {
            recorder,
            fail_with: Some(message.into()),
            _marker: PhantomData,
        }
    }

    fn finish(&self) -> Result<(), HandlerError> {
        match &self.fail_with {
            Some(message) => Err(HandlerError::failed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<M: BusMessage> CommandHandler for RecordingCommandHandler<M> {
    type Command = M;

    async fn handle(&self, command: M, ctx: &DispatchContext) -> Result<(), HandlerError> {
        let payload = serde_json::to_value(&command).unwrap_or(Value::Null);
        self.recorder.record(M::TYPE_NAME, ctx, payload);
        self.finish()
    }
}

/// An event handler that records every invocation, optionally failing.
///
/// Implements both event shapes so one double serves competing and
/// multicast scenarios.
pub struct RecordingEventHandler<M> {
    recorder: Arc<DispatchRecorder>,
    fail_with: Option<String>,
    _marker: PhantomData<fn() -> M>,
}

impl<M> RecordingEventHandler<M> {
    /// Creates a handler that records and succeeds.
    #[must_use]
    pub fn new(recorder: Arc<DispatchRecorder>) -> Self {
        Self {
            recorder,
            fail_with: None,
            _marker: PhantomData,
        }
    }

    /// Creates a handler that records and then fails with the message.
    #[must_use]
    pub fn failing(recorder: Arc<DispatchRecorder>, message: impl Into<String>) -> Self {
        Self {
            recorder,
            fail_with: Some(message.into()),
            _marker: PhantomData,
        }
    }

    fn record_and_finish(
        &self,
        type_name: &str,
        ctx: &DispatchContext,
        payload: Value,
    ) -> Result<(), HandlerError> {
        self.recorder.record(type_name, ctx, payload);
        match &self.fail_with {
            Some(message) => Err(HandlerError::failed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<M: BusMessage> CompetingEventHandler for RecordingEventHandler<M> {
    type Event = M;

    async fn handle(&self, event: M, ctx: &DispatchContext) -> Result<(), HandlerError> {
        let payload = serde_json::to_value(&event).unwrap_or(Value::Null);
        self.record_and_finish(M::TYPE_NAME, ctx, payload)
    }
}

#[async_trait]
impl<M: BusMessage> MulticastEventHandler for RecordingEventHandler<M> {
    type Event = M;

    async fn handle(&self, event: M, ctx: &DispatchContext) -> Result<(), HandlerError> {
        let payload = serde_json::to_value(&event).unwrap_or(Value::Null);
        self.record_and_finish(M::TYPE_NAME, ctx, payload)
    }
}
