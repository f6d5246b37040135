//! Request/response correlation.
//!
//! Turning asynchronous reply traffic into synchronous-looking request
//! calls: the [`RequestCorrelator`] records every outgoing request before
//! it is sent, matches incoming replies by correlation id, and enforces
//! deadlines through a periodic reaper task.

mod correlator;
mod error;
mod handle;

pub use correlator::RequestCorrelator;
pub use error::CorrelationError;
pub use handle::{MulticastHandle, ResponseHandle};
