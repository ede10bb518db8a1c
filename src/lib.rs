//! # thinglink - thing-model MQTT adapter for embedded devices
//!
//! Connects a constrained device to a cloud IoT broker that speaks the
//! "thing model" protocol over MQTT. The crate derives the signed MQTT login
//! from a device secret, names the device's topics, keeps the connection
//! alive, routes property and action messages to application handlers and
//! batches property reports.
//!
//! ## Features
//!
//! ### Thing model
//! - **Credentials**: HMAC-SHA256 signed login with expiry
//! - **Properties**: bound handlers for cloud control, coalesced periodic reports
//! - **Events**: `info`, `alert` and `fault` events with JSON parameters
//! - **Actions**: bound handlers with automatic `action_reply`
//! - **Reconnect policy**: periodic health checks, device restart after repeated failures
//!
//! ### Network
//! - **Byte-stream traits**: `Read`, `Write`, `Close`, `Connect`
//! - **MQTT Client**: MQTT 3.1.1 QoS 0 over any connection implementing them
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! thinglink = "0.1.0"
//! ```
//!
//! ### Session Example
//!
//! ```rust,no_run
//! use thinglink::network::application::mqtt::MqttTransport;
//! use thinglink::thing::{Config, DeviceIdentity, Params, Platform, Reply, Session};
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
//! # struct Board;
//! # impl Platform for Board {
//! #     fn now_ms(&self) -> u32 { 0 }
//! #     fn random(&mut self) -> u32 { 4 }
//! #     fn restart(&mut self) {}
//! # }
//!
//! let identity = DeviceIdentity::new("ABC123", "dev1", "c2VjcmV0LWtleS0xMjM0NTY=").unwrap();
//! let config = Config::default();
//! let transport = MqttTransport::new(Network, config.keep_alive_seconds);
//!
//! let mut on_power = |params: Params<'_>| {
//!     let _on = params.get::<u8>("power") == Some(1);
//!     Reply::SUCCESS
//! };
//!
//! let mut session = Session::begin(transport, Board, identity, config).unwrap();
//! session.bind_property("power", &mut on_power).unwrap();
//!
//! loop {
//!     session.send_property("temperature", &21.5f32).unwrap();
//!     let _ = session.tick();
//! }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Feature Flags
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging and `defmt::Format` for error types

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Network abstraction layer: byte-stream traits and the MQTT client.
pub mod network;

/// Thing-model session: credentials, topics, dispatch and reporting.
///
/// Built on top of the network layer, but usable with any MQTT client that
/// implements [`thing::Transport`].
pub mod thing;
