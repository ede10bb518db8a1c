//! MQTT 3.1.1 support for the thing-model session.
//!
//! [`client::Client`] speaks the wire protocol over any
//! [`Connection`](crate::network::Connection). [`transport::MqttTransport`]
//! wraps it with the reconnect-friendly shape the session expects: it owns a
//! [`Connect`](crate::network::Connect) implementation, opens a fresh stream
//! on every connect attempt, sends keep-alive pings and tracks a
//! PubSubClient-style state code.
//!
//! ```rust,no_run
//! use thinglink::network::application::mqtt::MqttTransport;
//! use thinglink::thing::Transport;
//! # use thinglink::network::{Close, Connect, Connection, Read, Write};
//! # struct Tcp;
//! # impl Connection for Tcp {}
//! # impl Read for Tcp {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Tcp {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Close for Tcp {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Network;
//! # impl Connect for Network {
//! #     type Connection = Tcp;
//! #     type Error = ();
//! #     fn connect(&mut self, _remote: &str) -> Result<Tcp, ()> { Ok(Tcp) }
//! # }
//!
//! let mut transport = MqttTransport::new(Network, 60);
//! transport.set_server("ABC123.iotcloud.tencentdevices.com", 1883).unwrap();
//! let _ = transport.connect("ABC123dev1", "user", "password");
//! ```

/// MQTT client implementation and supporting types.
pub mod client;

/// [`Transport`](crate::thing::Transport) implementation over [`client::Client`].
pub mod transport;

pub use client::{Client, Options, PublishPacket};
pub use transport::MqttTransport;
