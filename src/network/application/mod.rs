//! # Application Layer Network Protocols
//!
//! Protocol clients layered on the core [`Connection`](crate::network::Connection)
//! traits. They are connection agnostic, avoid heap allocation and keep every
//! buffer at a fixed size.
//!
//! - **[`mqtt`]**: MQTT 3.1.1 QoS-0 client and the thing-model
//!   [`Transport`](crate::thing::Transport) built on it

/// MQTT 3.1.1 client and transport adapter.
pub mod mqtt;
