//! Message type to transport path mapping.

use nimbus_types::{QueuePath, TopicPath};

/// Well-known path of the dead-letter queue.
pub const DEAD_LETTER_QUEUE: &str = "deadletteroffice";

/// Pure mapping from message type names to transport paths.
///
/// Routing is a total function with no I/O and no locks: the same type
/// name always maps to the same path, in every process, so independently
/// started instances agree on where each message type lives.
///
/// Paths follow `<prefix>.<type-name-lowercased>`; reply queues add the
/// sender identity so each instance owns a private reply queue.
///
/// # Example
///
/// ```
/// use nimbus_runtime::Router;
///
/// let router = Router::new("nimbus");
/// assert_eq!(router.queue_for("PlaceOrder").as_str(), "nimbus.placeorder");
/// assert_eq!(router.topic_for("OrderPlaced").as_str(), "nimbus.orderplaced");
/// ```
#[derive(Debug, Clone)]
pub struct Router {
    prefix: String,
}

impl Router {
    /// Creates a router with the given path prefix.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the queue path for a message type.
    #[must_use]
    pub fn queue_for(&self, message_type: &str) -> QueuePath {
        QueuePath::new(format!(
            "{}.{}",
            self.prefix,
            message_type.to_lowercase()
        ))
    }

    /// Returns the topic path for a message type.
    #[must_use]
    pub fn topic_for(&self, message_type: &str) -> TopicPath {
        TopicPath::new(format!(
            "{}.{}",
            self.prefix,
            message_type.to_lowercase()
        ))
    }

    /// Returns the private reply queue for a bus instance.
    #[must_use]
    pub fn reply_queue_for(&self, application: &str, instance: &str) -> QueuePath {
        QueuePath::new(format!(
            "{}.replies.{}.{}",
            self.prefix,
            application.to_lowercase(),
            instance.to_lowercase()
        ))
    }

    /// Returns the dead-letter queue path.
    #[must_use]
    pub fn dead_letter_queue(&self) -> QueuePath {
        QueuePath::new(DEAD_LETTER_QUEUE)
    }

    /// Returns the shared subscription name used by competing consumers
    /// of an application.
    #[must_use]
    pub fn competing_subscription(&self, application: &str) -> String {
        application.to_lowercase()
    }

    /// Returns the instance-private subscription name used for multicast
    /// delivery.
    #[must_use]
    pub fn multicast_subscription(&self, application: &str, instance: &str) -> String {
        format!(
            "{}.{}",
            application.to_lowercase(),
            instance.to_lowercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_stable_and_lowercased() {
        let router = Router::new("nimbus");
        assert_eq!(router.queue_for("PlaceOrder").as_str(), "nimbus.placeorder");
        assert_eq!(
            router.queue_for("PlaceOrder"),
            router.queue_for("PlaceOrder")
        );
    }

    #[test]
    fn queue_and_topic_share_the_naming_convention() {
        let router = Router::new("bus");
        assert_eq!(router.queue_for("X").as_str(), "bus.x");
        assert_eq!(router.topic_for("X").as_str(), "bus.x");
    }

    #[test]
    fn reply_queue_includes_identity() {
        let router = Router::new("nimbus");
        assert_eq!(
            router.reply_queue_for("Orders", "Orders-1").as_str(),
            "nimbus.replies.orders.orders-1"
        );
    }

    #[test]
    fn dead_letter_path_is_well_known() {
        assert_eq!(Router::new("x").dead_letter_queue().as_str(), "deadletteroffice");
    }

    #[test]
    fn subscription_names() {
        let router = Router::new("nimbus");
        assert_eq!(router.competing_subscription("Orders"), "orders");
        assert_eq!(
            router.multicast_subscription("Orders", "A1"),
            "orders.a1"
        );
    }
}
