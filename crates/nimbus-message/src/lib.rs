//! Envelope model and message factory for the Nimbus message bus.
//!
//! Everything that crosses the transport is an [`Envelope`]: the serialized
//! user payload plus the metadata the bus needs to route, correlate, and
//! redeliver it. This crate defines the envelope record, the bit-exact wire
//! property keys, the [`BusMessage`] trait user payloads implement, and the
//! [`MessageFactory`] that builds envelopes.
//!
//! # Envelope Lifecycle
//!
//! ```text
//! user payload
//!     │  MessageFactory::create()
//!     ▼
//! ┌───────────────────────────────────────────┐
//! │ Envelope                                  │
//! │   message_id        minted once           │
//! │   properties        Nimbus.MessageType,   │
//! │                     sender identity, ...  │
//! │   payload           serde_json::Value     │
//! │   enqueued_time_utc from the Clock        │
//! └───────────────────────────────────────────┘
//!     │  transport send / receive
//!     ▼
//! delivery_attempt bumped by the transport on each redelivery
//! ```
//!
//! # Replies
//!
//! A reply envelope preserves the request's `message_id` as its
//! `correlation_id`. Failed request handling produces a *faulted* reply:
//! the [`keys::FAULTED`] marker property plus a payload carrying the
//! serialized error detail.

mod envelope;
mod error;
mod factory;
mod message;
mod properties;

pub use envelope::Envelope;
pub use error::MessageError;
pub use factory::{MessageFactory, SenderIdentity};
pub use message::BusMessage;
pub use properties::{keys, PropertyValue};
