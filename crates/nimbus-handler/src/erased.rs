//! Type-erased handler adapters.
//!
//! The registry cannot store the typed handler traits directly: each has
//! its own message (and response) associated types. These adapters erase a
//! typed handler behind [`ErasedHandler`], decoding the payload on the way
//! in and encoding the response on the way out. One adapter per shape; the
//! adapter is what a [`Registration`](crate::Registration) factory builds.

use crate::context::DispatchContext;
use crate::error::HandlerError;
use crate::traits::{
    CommandHandler, CompetingEventHandler, MulticastEventHandler, MulticastRequestHandler,
    RequestHandler,
};
use async_trait::async_trait;
use nimbus_message::BusMessage;
use serde_json::Value;

/// A handler with its message types erased.
///
/// `invoke` returns `Ok(Some(value))` only for the request shapes, where
/// the value is the serialized response; the fire-and-forget shapes return
/// `Ok(None)`.
#[async_trait]
pub trait ErasedHandler: Send + Sync {
    /// Decodes the payload, runs the typed handler, encodes any response.
    async fn invoke(
        &self,
        payload: Value,
        ctx: &DispatchContext,
    ) -> Result<Option<Value>, HandlerError>;
}

fn decode<M: BusMessage>(payload: Value) -> Result<M, HandlerError> {
    serde_json::from_value(payload).map_err(|source| HandlerError::Payload {
        type_name: M::TYPE_NAME,
        source,
    })
}

fn encode<M: BusMessage>(response: &M) -> Result<Value, HandlerError> {
    serde_json::to_value(response).map_err(|source| HandlerError::Payload {
        type_name: M::TYPE_NAME,
        source,
    })
}

pub(crate) struct ErasedCommand<H>(pub H);

#[async_trait]
impl<H: CommandHandler> ErasedHandler for ErasedCommand<H> {
    async fn invoke(
        &self,
        payload: Value,
        ctx: &DispatchContext,
    ) -> Result<Option<Value>, HandlerError> {
        self.0.handle(decode(payload)?, ctx).await?;
        Ok(None)
    }
}

pub(crate) struct ErasedCompetingEvent<H>(pub H);

#[async_trait]
impl<H: CompetingEventHandler> ErasedHandler for ErasedCompetingEvent<H> {
    async fn invoke(
        &self,
        payload: Value,
        ctx: &DispatchContext,
    ) -> Result<Option<Value>, HandlerError> {
        self.0.handle(decode(payload)?, ctx).await?;
        Ok(None)
    }
}

pub(crate) struct ErasedMulticastEvent<H>(pub H);

#[async_trait]
impl<H: MulticastEventHandler> ErasedHandler for ErasedMulticastEvent<H> {
    async fn invoke(
        &self,
        payload: Value,
        ctx: &DispatchContext,
    ) -> Result<Option<Value>, HandlerError> {
        self.0.handle(decode(payload)?, ctx).await?;
        Ok(None)
    }
}

pub(crate) struct ErasedRequest<H>(pub H);

#[async_trait]
impl<H: RequestHandler> ErasedHandler for ErasedRequest<H> {
    async fn invoke(
        &self,
        payload: Value,
        ctx: &DispatchContext,
    ) -> Result<Option<Value>, HandlerError> {
        let response = self.0.handle(decode(payload)?, ctx).await?;
        Ok(Some(encode(&response)?))
    }
}

pub(crate) struct ErasedMulticastRequest<H>(pub H);

#[async_trait]
impl<H: MulticastRequestHandler> ErasedHandler for ErasedMulticastRequest<H> {
    async fn invoke(
        &self,
        payload: Value,
        ctx: &DispatchContext,
    ) -> Result<Option<Value>, HandlerError> {
        let response = self.0.handle(decode(payload)?, ctx).await?;
        Ok(Some(encode(&response)?))
    }
}
