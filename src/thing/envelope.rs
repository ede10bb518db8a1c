//! Outbound JSON envelopes.
//!
//! Every builder renders compact JSON into a fixed buffer sized to the MQTT
//! packet limit. `params` arguments are inserted verbatim and must already
//! be valid JSON objects.

use core::fmt::Display;

use heapless::String;
use serde::{Serialize, Serializer};

use super::Error;

/// Largest envelope, matching the transport packet buffer.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// A rendered envelope.
pub type Payload = String<MAX_PAYLOAD_LEN>;

/// Severity of a posted event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    /// Informational.
    #[default]
    Info,
    /// Needs attention.
    Alert,
    /// Something is broken.
    Fault,
}

impl EventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Info => "info",
            EventType::Alert => "alert",
            EventType::Fault => "fault",
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for EventType {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

#[derive(Serialize)]
struct Report {
    method: &'static str,
    #[serde(rename = "clientToken", serialize_with = "quoted")]
    client_token: u32,
}

#[derive(Serialize)]
struct EventPost<'a> {
    method: &'static str,
    #[serde(rename = "clientToken", serialize_with = "quoted")]
    client_token: u32,
    version: &'static str,
    #[serde(rename = "eventId")]
    event_id: &'a str,
    #[serde(rename = "type")]
    event_type: EventType,
}

#[derive(Serialize)]
struct ActionReply<'a> {
    method: &'static str,
    #[serde(rename = "clientToken")]
    client_token: &'a str,
    code: i32,
    status: &'a str,
    response: Empty,
}

#[derive(Serialize)]
struct ControlReply<'a> {
    method: &'static str,
    #[serde(rename = "clientToken")]
    client_token: &'a str,
    code: i32,
    status: &'a str,
}

#[derive(Serialize)]
struct Empty {}

/// Tokens minted by the device go out as JSON strings.
fn quoted<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// `{"method":"report",...}` property report.
pub fn report(client_token: u32, params: &str) -> Result<Payload, Error> {
    let header = Report {
        method: "report",
        client_token,
    };
    with_params(&header, params)
}

/// `{"method":"event_post",...}` event.
pub fn event_post(client_token: u32, event_id: &str, event_type: EventType, params: &str) -> Result<Payload, Error> {
    let header = EventPost {
        method: "event_post",
        client_token,
        version: "1.0",
        event_id,
        event_type,
    };
    with_params(&header, params)
}

/// `{"method":"action_reply",...}` answer to an action invocation.
pub fn action_reply(client_token: &str, code: i32, status: &str) -> Result<Payload, Error> {
    render(&ActionReply {
        method: "action_reply",
        client_token,
        code,
        status,
        response: Empty {},
    })
}

/// `{"method":"control_reply",...}` answer to a property control message.
pub fn control_reply(client_token: &str, code: i32, status: &str) -> Result<Payload, Error> {
    render(&ControlReply {
        method: "control_reply",
        client_token,
        code,
        status,
    })
}

fn render<T: Serialize>(envelope: &T) -> Result<Payload, Error> {
    serde_json_core::to_string(envelope).map_err(|_| Error::PayloadTooLarge)
}

/// Render `header` and append the pre-rendered `params` as its last member.
fn with_params<T: Serialize>(header: &T, params: &str) -> Result<Payload, Error> {
    let mut out = render(header)?;
    out.pop();
    out.push_str(",\"params\":").map_err(|_| Error::PayloadTooLarge)?;
    out.push_str(params).map_err(|_| Error::PayloadTooLarge)?;
    out.push('}').map_err(|_| Error::PayloadTooLarge)?;
    Ok(out)
}
