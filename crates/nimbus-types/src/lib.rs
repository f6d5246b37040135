//! Core types for the Nimbus message bus.
//!
//! This crate is the bottom of the workspace: identifier newtypes, transport
//! path newtypes, the [`ErrorCode`] trait that unifies error handling across
//! all Nimbus crates, and the injectable [`Clock`].
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  nimbus-types    : ids, paths, ErrorCode, Clock  ◄── HERE   │
//! │  nimbus-message  : Envelope, wire properties, factory       │
//! │  nimbus-handler  : handler traits, registry, resolver       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  nimbus-runtime  : transport, entities, correlator,         │
//! │                    dispatchers, broker facade               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Strategy
//!
//! All message identifiers are UUID v4 based. A [`MessageId`] is generated
//! exactly once per logical message (by the message factory); a reply carries
//! the originating request's id as its [`CorrelationId`]. Paths are plain
//! strings wrapped in newtypes so queue and topic destinations cannot be
//! confused at compile time.

mod clock;
mod error;
mod id;
mod path;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{CorrelationId, MessageId};
pub use path::{QueuePath, SubscriptionKey, TopicPath};
