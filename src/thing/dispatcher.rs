//! Inbound message routing.

use core::fmt::Write as _;

use heapless::String;
use serde::Deserialize;
use serde_json_core::str::EscapedStr;

use super::credentials::MAX_ID_LEN;
use super::json::{self, Params};
use super::platform::Platform;
use super::publisher::Publisher;
use super::registry::CallbackRegistry;
use super::transport::Transport;

/// Longest client token echoed back in a reply.
const MAX_TOKEN_LEN: usize = 64;

/// What happened to an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The topic is not one the device handles.
    Ignored,
    /// The payload is not a UTF-8 JSON object.
    Malformed,
    /// A property-down message ran `invoked` property handlers.
    Properties {
        /// Number of handlers that ran.
        invoked: usize,
    },
    /// An action handler ran; `replied` tells whether the reply went out.
    Action {
        /// Whether the `action_reply` was published.
        replied: bool,
    },
    /// An action-down message named no bound action.
    Unmatched,
}

/// The envelope members routing looks at. Everything else is skipped.
#[derive(Debug, Default, Deserialize)]
struct Envelope<'a> {
    #[serde(borrow)]
    method: Option<EscapedStr<'a>>,
    #[serde(rename = "actionId", borrow)]
    action_id: Option<EscapedStr<'a>>,
}

/// Route one inbound message to the bound handlers.
///
/// Property-down messages run every property handler whose id is a key of
/// `params`. Action-down messages run the action named by `actionId` and
/// answer on action-up. Anything else is ignored.
pub(crate) fn dispatch<T: Transport, P: Platform, const N: usize>(
    registry: &mut CallbackRegistry<'_, N>,
    publisher: &mut Publisher<'_, T, P>,
    control_reply: bool,
    topic: &str,
    payload: &[u8],
) -> Outcome {
    let topics = publisher.topics();
    let is_property = topic == topics.property_down();
    if !is_property && topic != topics.action_down() {
        trace!("message on unhandled topic");
        return Outcome::Ignored;
    }

    let Some(text) = core::str::from_utf8(payload)
        .ok()
        .filter(|text| json::validate_object(text).is_ok())
    else {
        debug!("dropping malformed message");
        return Outcome::Malformed;
    };
    let envelope = serde_json_core::from_str::<Envelope<'_>>(text)
        .map(|(envelope, _)| envelope)
        .unwrap_or_default();
    let params = Params::member(text, "params");

    if is_property {
        let (invoked, reply) = registry.invoke_properties(params);
        if let Some(reply) = reply {
            let is_control = envelope.method.is_some_and(|method| json::decodes_to(method, "control"));
            if control_reply && is_control {
                let token = client_token(text);
                if publisher.send_control_reply(&token, reply).is_err() {
                    warn!("control reply not sent");
                }
            }
        }
        return Outcome::Properties { invoked };
    }

    let Some(action_id) = envelope.action_id.and_then(json::unescape::<MAX_ID_LEN>) else {
        debug!("action message without actionId");
        return Outcome::Unmatched;
    };
    let Some(reply) = registry.invoke_action(&action_id, params) else {
        debug!("no handler for action");
        return Outcome::Unmatched;
    };

    let token = client_token(text);
    let replied = publisher.send_action_reply(&token, reply).is_ok();
    if !replied {
        warn!("action reply not sent");
    }
    Outcome::Action { replied }
}

/// The message's `clientToken`: a decoded string, or the text of an
/// integer. Missing, fractional or oversized tokens become empty.
fn client_token(text: &str) -> String<MAX_TOKEN_LEN> {
    let root = Params::parse(text).unwrap_or(Params::empty());
    if let Some(token) = root.get_str("clientToken") {
        return token;
    }
    let mut token = String::new();
    let written = match (root.get::<i64>("clientToken"), root.get::<u64>("clientToken")) {
        (Some(number), _) => write!(token, "{}", number),
        (None, Some(number)) => write!(token, "{}", number),
        (None, None) => Ok(()),
    };
    if written.is_err() {
        token.clear();
    }
    token
}
