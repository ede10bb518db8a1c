//! MQTT 3.1.1 client for the thing-model transport.
//!
//! This is a deliberately small client: QoS 0 only, clean sessions, and the
//! packets a device needs to talk to a thing-model broker (CONNECT with
//! username/password, PUBLISH, SUBSCRIBE, PINGREQ and DISCONNECT). It runs
//! over any byte stream implementing [`Connection`] and keeps every buffer in
//! fixed-size `heapless` storage.
//!
//! # Examples
//!
//! ```rust,no_run
//! use thinglink::network::application::mqtt::{Client, Options};
//! # use thinglink::network::Connection;
//! # struct TcpConnection;
//! # impl Connection for TcpConnection {}
//! # impl thinglink::network::Read for TcpConnection {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl thinglink::network::Write for TcpConnection {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl thinglink::network::Close for TcpConnection {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//!
//! let options = Options {
//!     client_id: "ABC123dev1",
//!     username: Some("ABC123dev1;12010126;12345;1924963199"),
//!     password: Some("0123...;hmacsha256"),
//!     keep_alive_seconds: 60,
//!     clean_session: true,
//! };
//!
//! let mut client = Client::connect(TcpConnection, options).unwrap();
//! client.subscribe("$thing/down/property/ABC123/dev1").unwrap();
//! client.publish("$thing/up/property/ABC123/dev1", br#"{"method":"report"}"#).unwrap();
//! ```

use crate::network::error::Error;
use crate::network::{Close, Connection, Read, Write};
use heapless::{String, Vec};

// MQTT Control Packet types - these are the fixed header packet type values
/// MQTT CONNECT packet type identifier.
const CONNECT: u8 = 0x10;
/// MQTT CONNACK packet type identifier.
const CONNACK: u8 = 0x20;
/// MQTT PUBLISH packet type identifier.
const PUBLISH: u8 = 0x30;
/// MQTT SUBSCRIBE packet type identifier.
const SUBSCRIBE: u8 = 0x82;
/// MQTT SUBACK packet type identifier.
const SUBACK: u8 = 0x90;
/// MQTT PINGREQ packet type identifier.
const PINGREQ: u8 = 0xC0;
/// MQTT DISCONNECT packet type identifier.
const DISCONNECT: u8 = 0xE0;

/// Largest topic accepted on an inbound PUBLISH.
pub const MAX_TOPIC_LEN: usize = 256;
/// Largest payload accepted on an inbound PUBLISH.
pub const MAX_PAYLOAD_LEN: usize = 1024;
/// Largest inbound packet body (topic length prefix, topic, packet id, payload).
const MAX_PACKET_LEN: usize = 2 + MAX_TOPIC_LEN + 2 + MAX_PAYLOAD_LEN;
/// Inbound PUBLISH packets held back while waiting for a SUBACK.
const PENDING_PUBLISHES: usize = 2;
/// Consecutive empty reads tolerated while a packet is expected, before
/// giving up with [`Error::Timeout`].
const MAX_IDLE_READS: u32 = 1_000;

/// An incoming MQTT publish message.
///
/// # Examples
///
/// ```rust
/// use thinglink::network::application::mqtt::PublishPacket;
/// use heapless::{String, Vec};
///
/// let packet = PublishPacket {
///     topic: String::try_from("$thing/down/property/ABC123/dev1").unwrap(),
///     payload: Vec::from_slice(br#"{"params":{"power":1}}"#).unwrap(),
/// };
///
/// assert_eq!(packet.topic.as_str(), "$thing/down/property/ABC123/dev1");
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PublishPacket {
    /// The topic on which the message was published.
    pub topic: String<MAX_TOPIC_LEN>,

    /// The message payload data.
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

// Protocol constants defined by MQTT 3.1.1 specification
/// MQTT protocol name as defined in the specification.
const PROTOCOL_NAME: &[u8] = b"MQTT";
/// MQTT protocol level for version 3.1.1.
const PROTOCOL_LEVEL: u8 = 4; // MQTT 3.1.1

/// Configuration options for MQTT client connection.
#[derive(Debug, Clone)]
pub struct Options<'a> {
    /// The client identifier, must be unique within the broker.
    pub client_id: &'a str,

    /// Optional user name sent in the CONNECT payload.
    pub username: Option<&'a str>,

    /// Optional password sent in the CONNECT payload.
    ///
    /// MQTT 3.1.1 only allows a password together with a user name; a
    /// password without a user name is ignored.
    pub password: Option<&'a str>,

    /// The keep-alive time interval in seconds. A value of 0 disables keep-alive.
    pub keep_alive_seconds: u16,

    /// Whether to start a clean session.
    pub clean_session: bool,
}

/// An MQTT 3.1.1 client for publish-subscribe messaging.
///
/// A `Client` only exists while the broker session is established: it is
/// created by [`Client::connect`] and consumed by [`Client::disconnect`].
pub struct Client<C: Connection> {
    connection: C,
    next_packet_id: u16,
    pending: Vec<PublishPacket, PENDING_PUBLISHES>,
}

impl<C: Connection> core::fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("next_packet_id", &self.next_packet_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl<C: Connection> Client<C> {
    /// Establish an MQTT connection with the broker.
    ///
    /// Sends a CONNECT packet and waits for the CONNACK.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send CONNECT packet
    /// * [`Error::ReadError`] - Failed to read CONNACK response
    /// * [`Error::Timeout`] - No CONNACK within the idle read limit
    /// * [`Error::ConnectionRefused`] - Broker refused the connection; carries the return code
    /// * [`Error::ProtocolError`] - Invalid CONNACK packet received or options too large
    pub fn connect(mut connection: C, options: Options) -> Result<Self, Error> {
        // --- Variable Header ---
        let mut vh: Vec<u8, 10> = Vec::new();
        push_bytes(&mut vh, &(PROTOCOL_NAME.len() as u16).to_be_bytes())?;
        push_bytes(&mut vh, PROTOCOL_NAME)?;

        let username = options.username;
        let password = username.and(options.password);

        let mut connect_flags = 0;
        if options.clean_session {
            connect_flags |= 0x02;
        }
        if username.is_some() {
            connect_flags |= 0x80;
        }
        if password.is_some() {
            connect_flags |= 0x40;
        }
        push_bytes(&mut vh, &[PROTOCOL_LEVEL, connect_flags])?;
        push_bytes(&mut vh, &options.keep_alive_seconds.to_be_bytes())?;

        // --- Payload ---
        let mut payload: Vec<u8, 512> = Vec::new();
        push_field(&mut payload, options.client_id.as_bytes())?;
        if let Some(username) = username {
            push_field(&mut payload, username.as_bytes())?;
        }
        if let Some(password) = password {
            push_field(&mut payload, password.as_bytes())?;
        }

        // --- Fixed Header ---
        let mut fixed_header: Vec<u8, 5> = Vec::new();
        push_bytes(&mut fixed_header, &[CONNECT])?;
        encode_remaining_length(&mut fixed_header, vh.len() + payload.len())?;

        write_all(&mut connection, &fixed_header)?;
        write_all(&mut connection, &vh)?;
        write_all(&mut connection, &payload)?;
        connection.flush().map_err(|_| Error::WriteError)?;

        // Wait for and parse CONNACK
        let mut connack_buf = [0u8; 4];
        read_exact(&mut connection, &mut connack_buf)?;

        if connack_buf[0] != CONNACK || connack_buf[1] != 2 {
            return Err(Error::ProtocolError);
        }

        match connack_buf[3] {
            0 => Ok(Self {
                connection,
                next_packet_id: 1,
                pending: Vec::new(),
            }),
            code @ 1..=5 => Err(Error::ConnectionRefused(code)),
            _ => Err(Error::ProtocolError),
        }
    }

    /// Publish a message to a topic with QoS 0.
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send the publish packet
    /// * [`Error::ProtocolError`] - Topic longer than the MQTT string limit
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Error> {
        let topic_bytes = topic.as_bytes();
        let topic_len = u16::try_from(topic_bytes.len()).map_err(|_| Error::ProtocolError)?;

        let mut fixed_header: Vec<u8, 5> = Vec::new();
        push_bytes(&mut fixed_header, &[PUBLISH])?;
        encode_remaining_length(&mut fixed_header, 2 + topic_bytes.len() + payload.len())?;

        write_all(&mut self.connection, &fixed_header)?;
        write_all(&mut self.connection, &topic_len.to_be_bytes())?;
        write_all(&mut self.connection, topic_bytes)?;
        write_all(&mut self.connection, payload)?;
        self.connection.flush().map_err(|_| Error::WriteError)?;

        Ok(())
    }

    /// Subscribe to a topic filter with QoS 0 and wait for the SUBACK.
    ///
    /// PUBLISH packets that arrive before the SUBACK are kept (up to a small
    /// fixed number) and returned by the next calls to [`Client::poll`].
    ///
    /// # Errors
    ///
    /// * [`Error::WriteError`] - Failed to send the subscribe packet
    /// * [`Error::ReadError`] - Failed to read SUBACK response
    /// * [`Error::Timeout`] - No SUBACK within the idle read limit
    /// * [`Error::ProtocolError`] - Invalid SUBACK or subscription rejected
    pub fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        let packet_id = self.next_packet_id();
        let topic_bytes = topic.as_bytes();
        let topic_len = u16::try_from(topic_bytes.len()).map_err(|_| Error::ProtocolError)?;

        let mut fixed_header: Vec<u8, 5> = Vec::new();
        push_bytes(&mut fixed_header, &[SUBSCRIBE])?;
        encode_remaining_length(&mut fixed_header, 2 + 2 + topic_bytes.len() + 1)?;

        write_all(&mut self.connection, &fixed_header)?;
        write_all(&mut self.connection, &packet_id.to_be_bytes())?;
        write_all(&mut self.connection, &topic_len.to_be_bytes())?;
        write_all(&mut self.connection, topic_bytes)?;
        write_all(&mut self.connection, &[0])?;
        self.connection.flush().map_err(|_| Error::WriteError)?;

        loop {
            let Some((header, body)) = self.read_packet(true)? else {
                continue;
            };
            match header & 0xF0 {
                SUBACK => {
                    if body.len() != 3 || u16::from_be_bytes([body[0], body[1]]) != packet_id {
                        return Err(Error::ProtocolError);
                    }
                    return if body[2] == 0x80 {
                        Err(Error::ProtocolError)
                    } else {
                        Ok(())
                    };
                }
                PUBLISH => {
                    let packet = parse_publish(header, &body)?;
                    // Anything beyond the pending capacity is dropped, as QoS 0 allows.
                    let _ = self.pending.push(packet);
                }
                _ => {}
            }
        }
    }

    /// Send a PINGREQ to keep the session alive.
    ///
    /// The PINGRESP is consumed by [`Client::poll`].
    pub fn ping(&mut self) -> Result<(), Error> {
        write_all(&mut self.connection, &[PINGREQ, 0])?;
        self.connection.flush().map_err(|_| Error::WriteError)
    }

    /// Poll the connection for an incoming PUBLISH.
    ///
    /// Non-PUBLISH packets (PINGRESP, stray acknowledgements) are consumed
    /// and reported as `Ok(None)`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(packet))` - A publish message was received
    /// * `Ok(None)` - No message available at this time
    /// * `Err(error)` - Network or protocol error occurred
    pub fn poll(&mut self) -> Result<Option<PublishPacket>, Error> {
        if !self.pending.is_empty() {
            return Ok(Some(self.pending.remove(0)));
        }

        match self.read_packet(false)? {
            Some((header, body)) if header & 0xF0 == PUBLISH => {
                parse_publish(header, &body).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Send DISCONNECT and close the underlying connection.
    pub fn disconnect(mut self) -> Result<(), Error> {
        write_all(&mut self.connection, &[DISCONNECT, 0])?;
        self.connection.flush().map_err(|_| Error::WriteError)?;
        self.connection.close().map_err(|_| Error::ConnectionClosed)
    }

    fn next_packet_id(&mut self) -> u16 {
        let id = self.next_packet_id;
        self.next_packet_id = self.next_packet_id.checked_add(1).unwrap_or(1);
        id
    }

    /// Read one complete packet.
    ///
    /// Without `blocking`, returns `Ok(None)` when no packet has started.
    /// Once the first byte is in, the rest of the packet is waited for
    /// through empty reads, up to [`MAX_IDLE_READS`] in a row.
    fn read_packet(&mut self, blocking: bool) -> Result<Option<(u8, Vec<u8, MAX_PACKET_LEN>)>, Error> {
        let mut header = [0u8; 1];
        if blocking {
            read_exact(&mut self.connection, &mut header)?;
        } else {
            match self.connection.read(&mut header) {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(_) => return Err(Error::ReadError),
            }
        }

        let remaining_len = decode_remaining_length(&mut self.connection)?;
        let mut body: Vec<u8, MAX_PACKET_LEN> = Vec::new();
        if remaining_len > MAX_PACKET_LEN {
            discard(&mut self.connection, remaining_len)?;
            return Err(Error::ProtocolError);
        }
        body.resize(remaining_len, 0)
            .map_err(|_| Error::ProtocolError)?;
        read_exact(&mut self.connection, &mut body)?;

        Ok(Some((header[0], body)))
    }
}

/// Split a PUBLISH body into topic and payload.
fn parse_publish(header: u8, body: &[u8]) -> Result<PublishPacket, Error> {
    if body.len() < 2 {
        return Err(Error::ProtocolError);
    }
    let topic_len = u16::from_be_bytes([body[0], body[1]]) as usize;
    let topic_end = 2 + topic_len;
    if body.len() < topic_end {
        return Err(Error::ProtocolError);
    }

    let topic = core::str::from_utf8(&body[2..topic_end]).map_err(|_| Error::ProtocolError)?;
    let topic = String::try_from(topic).map_err(|_| Error::ProtocolError)?;

    // QoS 1 and 2 carry a packet identifier after the topic.
    let payload_start = if (header >> 1) & 0x03 != 0 {
        topic_end + 2
    } else {
        topic_end
    };
    let payload = body.get(payload_start..).ok_or(Error::ProtocolError)?;
    let payload = Vec::from_slice(payload).map_err(|_| Error::ProtocolError)?;

    Ok(PublishPacket { topic, payload })
}

fn push_bytes<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes).map_err(|_| Error::ProtocolError)
}

/// Append a length-prefixed MQTT string.
fn push_field<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(bytes.len()).map_err(|_| Error::ProtocolError)?;
    push_bytes(buf, &len.to_be_bytes())?;
    push_bytes(buf, bytes)
}

fn write_all<C: Write>(connection: &mut C, mut buf: &[u8]) -> Result<(), Error> {
    while !buf.is_empty() {
        match connection.write(buf) {
            Ok(0) => return Err(Error::WriteError),
            Ok(n) => buf = &buf[n..],
            Err(_) => return Err(Error::WriteError),
        }
    }
    Ok(())
}

/// Fill `buf`, riding out empty reads from a non-blocking stream.
fn read_exact<C: Read>(connection: &mut C, buf: &mut [u8]) -> Result<(), Error> {
    let mut total_read = 0;
    let mut idle = 0;
    while total_read < buf.len() {
        match connection.read(&mut buf[total_read..]) {
            Ok(0) => {
                idle += 1;
                if idle >= MAX_IDLE_READS {
                    return Err(Error::Timeout);
                }
            }
            Ok(n) => {
                total_read += n;
                idle = 0;
            }
            Err(_) => return Err(Error::ReadError),
        }
    }
    Ok(())
}

fn discard<C: Read>(connection: &mut C, mut len: usize) -> Result<(), Error> {
    let mut scratch = [0u8; 64];
    while len > 0 {
        let chunk = len.min(scratch.len());
        read_exact(connection, &mut scratch[..chunk])?;
        len -= chunk;
    }
    Ok(())
}

/// Encode the remaining length field for an MQTT packet.
///
/// Each byte carries 7 bits of the length; the high bit marks a
/// continuation. At most four bytes are allowed.
fn encode_remaining_length(buf: &mut Vec<u8, 5>, mut len: usize) -> Result<(), Error> {
    let mut written = 0;
    loop {
        if written == 4 {
            return Err(Error::ProtocolError);
        }
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        buf.push(byte).map_err(|_| Error::ProtocolError)?;
        written += 1;
        if len == 0 {
            return Ok(());
        }
    }
}

fn decode_remaining_length<C: Read>(connection: &mut C) -> Result<usize, Error> {
    let mut remaining_len = 0;
    let mut multiplier = 1;
    for _ in 0..4 {
        let mut byte = [0u8; 1];
        read_exact(connection, &mut byte)?;
        remaining_len += (byte[0] as usize & 0x7F) * multiplier;
        if byte[0] & 0x80 == 0 {
            return Ok(remaining_len);
        }
        multiplier *= 128;
    }
    Err(Error::ProtocolError)
}
