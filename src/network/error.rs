//! Errors raised by byte streams and the MQTT client running over them.

use crate::thing::transport::state;

/// Failure of a stream or MQTT operation.
///
/// Kept `Copy` and allocation free so it can travel through `no_std`
/// transports unchanged.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No stream is open, or the stream could not be opened.
    NotOpen,
    /// Writing to the stream failed.
    WriteError,
    /// Reading from the stream failed.
    ReadError,
    /// The broker answered CONNECT with a non-zero CONNACK return code.
    ConnectionRefused(u8),
    /// The broker did not answer in time.
    Timeout,
    /// The peer closed the stream.
    ConnectionClosed,
    /// The server address is empty or does not fit.
    InvalidAddress,
    /// A malformed, unexpected or oversized packet.
    ProtocolError,
}

impl Error {
    /// Transport state code recorded after a failed connect attempt.
    ///
    /// Broker refusals keep their CONNACK code (1..=5), a missing CONNACK
    /// maps to [`state::CONNECTION_TIMEOUT`], anything else to
    /// [`state::CONNECT_FAILED`].
    pub fn connect_state(&self) -> i8 {
        match *self {
            Error::ConnectionRefused(code) => i8::try_from(code).unwrap_or(state::CONNECT_FAILED),
            Error::Timeout => state::CONNECTION_TIMEOUT,
            _ => state::CONNECT_FAILED,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::NotOpen => f.write_str("stream not open"),
            Error::WriteError => f.write_str("write failed"),
            Error::ReadError => f.write_str("read failed"),
            Error::ConnectionRefused(code) => write!(f, "broker refused login (code {})", code),
            Error::Timeout => f.write_str("broker timed out"),
            Error::ConnectionClosed => f.write_str("stream closed by peer"),
            Error::InvalidAddress => f.write_str("invalid server address"),
            Error::ProtocolError => f.write_str("mqtt protocol error"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused(code) => defmt::write!(f, "ConnectionRefused({})", code),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
        }
    }
}
