//! # Thing-model session
//!
//! Connects a device to an IoT broker that speaks the "thing model"
//! protocol: properties are reported and controlled, events are posted and
//! actions are invoked, each over its own pair of MQTT topics with JSON
//! envelopes.
//!
//! ## Structure
//!
//! - [`credentials`]: device identity and the HMAC-signed MQTT login
//! - [`topics`]: the six `$thing/...` topics of a device
//! - [`json`]: validating, zero-copy view over inbound JSON objects
//! - [`envelope`]: outbound `report`, `event_post` and reply envelopes
//! - [`registry`]: bounded table of property and action handlers
//! - [`buffer`]: coalescing buffer for periodic property reports
//! - [`publisher`]: envelope publishing over a [`Transport`]
//! - [`session`]: reconnect policy, inbound routing and the main `tick`
//!
//! The session is generic over a [`Transport`] (an MQTT client) and a
//! [`Platform`] (clock, random source and restart). A transport built on
//! the bundled MQTT client lives in
//! [`network::application::mqtt`](crate::network::application::mqtt).
//!
//! ## Example
//!
//! ```rust,ignore
//! use thinglink::thing::{Config, DeviceIdentity, Params, Reply, Session};
//!
//! let identity = DeviceIdentity::new("ABC123", "dev1", "c2VjcmV0LWtleS0xMjM0NTY=")?;
//!
//! let mut on_power = |params: Params<'_>| {
//!     let on = params.get::<u8>("power") == Some(1);
//!     relay.set(on);
//!     Reply::SUCCESS
//! };
//!
//! let mut session = Session::begin(transport, platform, identity, Config::default())?;
//! session.bind_property("power", &mut on_power)?;
//!
//! loop {
//!     session.send_property("temperature", &sensor.read())?;
//!     let _ = session.tick();
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod credentials;
mod dispatcher;
pub mod envelope;
mod error;
pub mod json;
pub mod platform;
pub mod publisher;
pub mod registry;
pub mod session;
pub mod topics;
pub mod transport;

pub use buffer::PropertyBuffer;
pub use config::Config;
pub use credentials::{Credentials, DeviceIdentity};
pub use dispatcher::Outcome;
pub use envelope::EventType;
pub use error::Error;
pub use json::Params;
pub use platform::Platform;
pub use publisher::Publisher;
pub use registry::{CallbackRegistry, Handler, Kind, Reply};
pub use session::Session;
pub use topics::TopicSet;
pub use transport::{Message, Transport};
