//! Thing-model topic names.

use core::fmt::Write as _;

use heapless::String;

use super::Error;

/// Longest topic or broker host name.
pub const MAX_TOPIC_LEN: usize = 160;

/// The six topics of one device.
///
/// ```rust
/// use thinglink::thing::TopicSet;
///
/// let topics = TopicSet::new("ABC123", "dev1").unwrap();
/// assert_eq!(topics.property_up(), "$thing/up/property/ABC123/dev1");
/// assert_eq!(topics.action_down(), "$thing/down/action/ABC123/dev1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSet {
    property_up: String<MAX_TOPIC_LEN>,
    property_down: String<MAX_TOPIC_LEN>,
    event_up: String<MAX_TOPIC_LEN>,
    event_down: String<MAX_TOPIC_LEN>,
    action_up: String<MAX_TOPIC_LEN>,
    action_down: String<MAX_TOPIC_LEN>,
}

impl TopicSet {
    /// Build all topics for a device.
    ///
    /// Fails with [`Error::IdentifierTooLong`] instead of truncating.
    pub fn new(product_id: &str, device_name: &str) -> Result<Self, Error> {
        Ok(Self {
            property_up: topic("up", "property", product_id, device_name)?,
            property_down: topic("down", "property", product_id, device_name)?,
            event_up: topic("up", "event", product_id, device_name)?,
            event_down: topic("down", "event", product_id, device_name)?,
            action_up: topic("up", "action", product_id, device_name)?,
            action_down: topic("down", "action", product_id, device_name)?,
        })
    }

    /// Device to cloud property reports and control replies.
    pub fn property_up(&self) -> &str {
        &self.property_up
    }

    /// Cloud to device property control.
    pub fn property_down(&self) -> &str {
        &self.property_down
    }

    /// Device to cloud events.
    pub fn event_up(&self) -> &str {
        &self.event_up
    }

    /// Cloud to device event acknowledgements. Not subscribed.
    pub fn event_down(&self) -> &str {
        &self.event_down
    }

    /// Device to cloud action replies.
    pub fn action_up(&self) -> &str {
        &self.action_up
    }

    /// Cloud to device action invocations.
    pub fn action_down(&self) -> &str {
        &self.action_down
    }
}

/// Broker host for a product: `{product_id}.{suffix}`.
pub fn broker_host(product_id: &str, suffix: &str) -> Result<String<MAX_TOPIC_LEN>, Error> {
    let mut host = String::new();
    write!(host, "{}.{}", product_id, suffix).map_err(|_| Error::IdentifierTooLong)?;
    Ok(host)
}

fn topic(direction: &str, class: &str, product_id: &str, device_name: &str) -> Result<String<MAX_TOPIC_LEN>, Error> {
    let mut topic = String::new();
    write!(topic, "$thing/{}/{}/{}/{}", direction, class, product_id, device_name)
        .map_err(|_| Error::IdentifierTooLong)?;
    Ok(topic)
}
