//! The trait user payloads implement to travel on the bus.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A user message that can be carried by the bus.
///
/// The associated [`TYPE_NAME`](Self::TYPE_NAME) is the canonical wire name
/// stamped into the `Nimbus.MessageType` envelope property. It must be
/// stable across processes and releases: the receiving side looks handlers
/// up by this exact string, and the router derives queue and topic paths
/// from it.
///
/// # Example
///
/// ```
/// use nimbus_message::BusMessage;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct PlaceOrder {
///     order_id: u64,
/// }
///
/// impl BusMessage for PlaceOrder {
///     const TYPE_NAME: &'static str = "PlaceOrder";
/// }
///
/// assert_eq!(PlaceOrder::TYPE_NAME, "PlaceOrder");
/// ```
pub trait BusMessage: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Canonical wire name of this message type.
    const TYPE_NAME: &'static str;
}
