//! Transport path newtypes.
//!
//! Queues and topics are addressed by string paths. Wrapping them in
//! newtypes keeps the two address spaces apart at compile time: a queue
//! sender cannot be handed a topic path by accident.
//!
//! Path construction is the router's job; these types do not validate or
//! normalize beyond storing the string.

use serde::{Deserialize, Serialize};

/// Path of a queue on the transport.
///
/// # Example
///
/// ```
/// use nimbus_types::QueuePath;
///
/// let path = QueuePath::new("nimbus.placeorder");
/// assert_eq!(path.as_str(), "nimbus.placeorder");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueuePath(String);

impl QueuePath {
    /// Creates a queue path from a string.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueuePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a topic on the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicPath(String);

impl TopicPath {
    /// Creates a topic path from a string.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TopicPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Composite key identifying a subscription: the owning topic plus the
/// subscription name.
///
/// The known-entity set uses the `topic/name` rendering as its membership
/// key, so two subscriptions with the same name on different topics are
/// distinct.
///
/// # Example
///
/// ```
/// use nimbus_types::{SubscriptionKey, TopicPath};
///
/// let key = SubscriptionKey::new(TopicPath::new("nimbus.orderplaced"), "billing");
/// assert_eq!(key.to_string(), "nimbus.orderplaced/billing");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    topic: TopicPath,
    name: String,
}

impl SubscriptionKey {
    /// Creates a subscription key.
    #[must_use]
    pub fn new(topic: TopicPath, name: impl Into<String>) -> Self {
        Self {
            topic,
            name: name.into(),
        }
    }

    /// Returns the owning topic.
    #[must_use]
    pub fn topic(&self) -> &TopicPath {
        &self.topic
    }

    /// Returns the subscription name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.topic, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_and_topic_paths_are_distinct_types() {
        let q = QueuePath::new("a.b");
        let t = TopicPath::new("a.b");
        assert_eq!(q.as_str(), t.as_str());
    }

    #[test]
    fn subscription_key_renders_composite() {
        let key = SubscriptionKey::new(TopicPath::new("t1"), "sub");
        assert_eq!(key.to_string(), "t1/sub");
        assert_eq!(key.topic().as_str(), "t1");
        assert_eq!(key.name(), "sub");
    }

    #[test]
    fn subscription_keys_differ_by_topic() {
        let a = SubscriptionKey::new(TopicPath::new("t1"), "sub");
        let b = SubscriptionKey::new(TopicPath::new("t2"), "sub");
        assert_ne!(a, b);
    }
}
