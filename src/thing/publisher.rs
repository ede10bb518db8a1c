//! Outbound messages.

use super::Error;
use super::envelope::{self, EventType};
use super::json::validate_object;
use super::platform::{Platform, draw};
use super::registry::Reply;
use super::topics::TopicSet;
use super::transport::Transport;

/// Client tokens are drawn from `[0, 99999)`.
const CLIENT_TOKEN_MAX: u32 = 99_999;

/// Builds envelopes and publishes them on the device's topics.
///
/// A publisher borrows the session's transport, platform and topics for
/// the duration of one operation.
#[derive(Debug)]
pub struct Publisher<'a, T: Transport, P: Platform> {
    transport: &'a mut T,
    platform: &'a mut P,
    topics: &'a TopicSet,
}

impl<'a, T: Transport, P: Platform> Publisher<'a, T, P> {
    /// Borrow what publishing needs.
    pub fn new(transport: &'a mut T, platform: &'a mut P, topics: &'a TopicSet) -> Self {
        Self {
            transport,
            platform,
            topics,
        }
    }

    /// The topics messages go to.
    pub fn topics(&self) -> &'a TopicSet {
        self.topics
    }

    /// Report properties on property-up.
    ///
    /// `params` must be a JSON object.
    pub fn send_properties(&mut self, params: &str) -> Result<(), Error> {
        validate_object(params)?;
        let payload = envelope::report(self.client_token(), params.trim())?;
        let topics = self.topics;
        self.publish(topics.property_up(), &payload)
    }

    /// Post an event on event-up.
    ///
    /// `params` must be a JSON object.
    pub fn send_event(&mut self, event_id: &str, params: &str, event_type: EventType) -> Result<(), Error> {
        validate_object(params)?;
        let payload = envelope::event_post(self.client_token(), event_id, event_type, params.trim())?;
        let topics = self.topics;
        self.publish(topics.event_up(), &payload)
    }

    /// Answer an action invocation on action-up.
    pub fn send_action_reply(&mut self, client_token: &str, reply: Reply) -> Result<(), Error> {
        let payload = envelope::action_reply(client_token, reply.code, reply.status)?;
        let topics = self.topics;
        self.publish(topics.action_up(), &payload)
    }

    /// Answer a property control message on property-up.
    pub fn send_control_reply(&mut self, client_token: &str, reply: Reply) -> Result<(), Error> {
        let payload = envelope::control_reply(client_token, reply.code, reply.status)?;
        let topics = self.topics;
        self.publish(topics.property_up(), &payload)
    }

    fn client_token(&mut self) -> u32 {
        draw(self.platform, 0, CLIENT_TOKEN_MAX)
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), Error> {
        if !self.transport.connected() {
            debug!("publish skipped, not connected");
            return Err(Error::NotConnected);
        }
        self.transport.publish(topic, payload.as_bytes()).map_err(|_| {
            warn!("publish failed");
            Error::Transport
        })
    }
}
