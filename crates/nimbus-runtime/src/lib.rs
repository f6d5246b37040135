//! Nimbus runtime: dispatch, correlation, and broker plumbing.
//!
//! This crate is the engine between user-authored handlers and the
//! backing queue/topic transport. It is NOT part of the handler SDK;
//! applications depend on it only to build and run a bus instance.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Handler SDK Layer                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  nimbus-types    : ids, paths, ErrorCode, Clock             │
//! │  nimbus-message  : Envelope, wire properties, factory       │
//! │  nimbus-handler  : handler traits, registry, resolver       │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Runtime Layer (THIS CRATE)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  transport/    : Transport seam + in-memory driver          │
//! │  entity/       : lazy idempotent queue/topic provisioning   │
//! │  router        : message type → path, pure                  │
//! │  interceptor/  : ordered inbound/outbound hook chains       │
//! │  correlation/  : outstanding requests, deadlines, reaper    │
//! │  dispatch/     : five dispatcher variants                   │
//! │  pump          : receive loops, ack/nack, dead-lettering    │
//! │  bus/          : Bus facade + BusBuilder                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Interaction Patterns
//!
//! | Operation | Route | Consumers | Reply |
//! |-----------|-------|-----------|-------|
//! | `Bus::send` | queue | one | none |
//! | `Bus::publish` | topic | competing or all | none |
//! | `Bus::request` | queue | one | exactly one |
//! | `Bus::multicast_request` | topic | all | zero or more |
//!
//! # Outbound Flow
//!
//! ```text
//! user call ─► verifier ─► router ─► entity manager (lazy ensure)
//!     ─► message factory ─► outbound interceptors ─► transport send
//! ```
//!
//! For requests, the correlator records the pending request between
//! envelope build and send; the caller awaits the returned handle.
//!
//! # Inbound Flow
//!
//! ```text
//! pump receive ─► dispatcher ─► registry lookup ─► open scope
//!     ─► inbound interceptors ─► handler(s) ─► (reply send)
//!     ─► scope closed ─► pump acks or nacks
//! ```

pub mod bus;
pub mod config;
pub mod correlation;
pub mod dispatch;
pub mod entity;
pub mod interceptor;
pub mod router;
pub mod transport;

mod pump;

pub use bus::{Bus, BusBuilder, BusError, KnownMessageTypeVerifier};
pub use config::BusConfig;
pub use correlation::{CorrelationError, MulticastHandle, RequestCorrelator, ResponseHandle};
pub use dispatch::{DispatchError, Dispatcher};
pub use entity::{EntityError, EntityManager, RetryPolicy};
pub use interceptor::{
    InboundInterceptor, InboundInterceptorFactory, InterceptorError, OutboundInterceptor,
    OutboundInterceptorFactory,
};
pub use router::Router;
pub use transport::{InMemoryTransport, Transport, TransportError};
