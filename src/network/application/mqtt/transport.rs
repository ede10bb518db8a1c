use core::fmt::Write as _;

use heapless::String;

use super::client::{Client, Options};
use crate::network::Connect;
use crate::network::error::Error;
use crate::thing::platform::elapsed;
use crate::thing::transport::{Message, Transport, state};

/// Room for `host:port`.
const MAX_SERVER_LEN: usize = 160;

/// A reconnecting MQTT transport.
///
/// Owns a [`Connect`] implementation and opens a fresh stream for every
/// connect attempt. A broken session is dropped on the first failing
/// operation and reported through [`Transport::connected`] and
/// [`Transport::state`], leaving recovery to the caller.
pub struct MqttTransport<N: Connect> {
    network: N,
    server: String<MAX_SERVER_LEN>,
    keep_alive_seconds: u16,
    client: Option<Client<N::Connection>>,
    state: i8,
    last_ping: Option<u32>,
}

impl<N: Connect> core::fmt::Debug for MqttTransport<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MqttTransport")
            .field("server", &self.server)
            .field("keep_alive_seconds", &self.keep_alive_seconds)
            .field("state", &self.state)
            .finish()
    }
}

impl<N: Connect> MqttTransport<N> {
    /// Create a disconnected transport.
    ///
    /// `keep_alive_seconds` is announced to the broker and drives the
    /// PINGREQ cadence in [`Transport::poll`].
    pub fn new(network: N, keep_alive_seconds: u16) -> Self {
        Self {
            network,
            server: String::new(),
            keep_alive_seconds,
            client: None,
            state: state::DISCONNECTED,
            last_ping: None,
        }
    }

    /// The configured `host:port`, empty until [`Transport::set_server`].
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Send DISCONNECT and drop the session, if any.
    pub fn disconnect(&mut self) -> Result<(), Error> {
        self.state = state::DISCONNECTED;
        self.last_ping = None;
        match self.client.take() {
            Some(client) => client.disconnect(),
            None => Ok(()),
        }
    }

    fn lose(&mut self, error: Error) -> Error {
        warn!("mqtt session lost");
        self.client = None;
        self.last_ping = None;
        self.state = state::CONNECTION_LOST;
        error
    }

    fn client(&mut self) -> Result<&mut Client<N::Connection>, Error> {
        self.client.as_mut().ok_or(Error::NotOpen)
    }
}

impl<N: Connect> Transport for MqttTransport<N> {
    type Error = Error;

    fn set_server(&mut self, host: &str, port: u16) -> Result<(), Error> {
        self.server.clear();
        write!(self.server, "{}:{}", host, port).map_err(|_| Error::InvalidAddress)
    }

    fn connect(&mut self, client_id: &str, username: &str, password: &str) -> Result<(), Error> {
        self.client = None;
        self.last_ping = None;
        if self.server.is_empty() {
            self.state = state::CONNECT_FAILED;
            return Err(Error::InvalidAddress);
        }

        let connection = match self.network.connect(&self.server) {
            Ok(connection) => connection,
            Err(_) => {
                self.state = state::CONNECT_FAILED;
                return Err(Error::NotOpen);
            }
        };

        let options = Options {
            client_id,
            username: Some(username),
            password: Some(password),
            keep_alive_seconds: self.keep_alive_seconds,
            clean_session: true,
        };

        match Client::connect(connection, options) {
            Ok(client) => {
                self.client = Some(client);
                self.state = state::CONNECTED;
                Ok(())
            }
            Err(error) => {
                warn!("mqtt login failed");
                self.state = error.connect_state();
                Err(error)
            }
        }
    }

    fn connected(&self) -> bool {
        self.client.is_some()
    }

    fn state(&self) -> i8 {
        self.state
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Error> {
        let result = self.client()?.publish(topic, payload);
        result.map_err(|error| self.lose(error))
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Error> {
        let result = self.client()?.subscribe(topic);
        match result {
            // A refused subscription leaves the session intact.
            Err(Error::ProtocolError) => Err(Error::ProtocolError),
            other => other.map_err(|error| self.lose(error)),
        }
    }

    fn poll(&mut self, now_ms: u32) -> Result<Option<Message>, Error> {
        if self.client.is_none() {
            return Ok(None);
        }

        let keep_alive_ms = u32::from(self.keep_alive_seconds) * 1_000;
        let ping_due = match self.last_ping {
            None => {
                self.last_ping = Some(now_ms);
                false
            }
            Some(since) => keep_alive_ms > 0 && elapsed(now_ms, since) >= keep_alive_ms,
        };
        if ping_due {
            let pinged = self.client()?.ping();
            pinged.map_err(|error| self.lose(error))?;
            self.last_ping = Some(now_ms);
        }

        // A packet cut short leaves the stream out of step, so any error
        // ends the session.
        let polled = self.client()?.poll();
        polled.map_err(|error| self.lose(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{Close, Connection, Read, Write};
    use heapless::Vec;

    #[derive(Default)]
    struct Wire {
        inbound: Vec<u8, 256>,
        read_pos: usize,
        outbound: Vec<u8, 512>,
    }

    struct Stream<'w> {
        wire: &'w core::cell::RefCell<Wire>,
    }

    impl Read for Stream<'_> {
        type Error = ();
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            let mut wire = self.wire.borrow_mut();
            let start = wire.read_pos;
            let n = buf.len().min(wire.inbound.len() - start);
            buf[..n].copy_from_slice(&wire.inbound[start..start + n]);
            wire.read_pos += n;
            Ok(n)
        }
    }

    impl Write for Stream<'_> {
        type Error = ();
        fn write(&mut self, buf: &[u8]) -> Result<usize, ()> {
            let mut wire = self.wire.borrow_mut();
            wire.outbound.extend_from_slice(buf).map_err(|_| ())?;
            Ok(buf.len())
        }
        fn flush(&mut self) -> Result<(), ()> {
            Ok(())
        }
    }

    impl Close for Stream<'_> {
        type Error = ();
        fn close(self) -> Result<(), ()> {
            Ok(())
        }
    }

    impl Connection for Stream<'_> {}

    struct Net<'w> {
        wire: &'w core::cell::RefCell<Wire>,
        reachable: bool,
        last_remote: String<MAX_SERVER_LEN>,
    }

    impl<'w> Connect for Net<'w> {
        type Connection = Stream<'w>;
        type Error = ();
        fn connect(&mut self, remote: &str) -> Result<Stream<'w>, ()> {
            self.last_remote = String::try_from(remote).map_err(|_| ())?;
            if self.reachable {
                Ok(Stream { wire: self.wire })
            } else {
                Err(())
            }
        }
    }

    fn wire_with(inbound: &[u8]) -> core::cell::RefCell<Wire> {
        let mut wire = Wire::default();
        wire.inbound.extend_from_slice(inbound).unwrap();
        core::cell::RefCell::new(wire)
    }

    #[test]
    fn test_connect_uses_configured_server() {
        let wire = wire_with(&[0x20, 0x02, 0x00, 0x00]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);

        transport.set_server("ABC123.iotcloud.tencentdevices.com", 1883).unwrap();
        transport.connect("ABC123dev1", "user", "pass").unwrap();

        assert!(transport.connected());
        assert_eq!(transport.state(), state::CONNECTED);
        assert_eq!(transport.network.last_remote.as_str(), "ABC123.iotcloud.tencentdevices.com:1883");
    }

    #[test]
    fn test_unreachable_broker_sets_connect_failed() {
        let wire = wire_with(&[]);
        let net = Net { wire: &wire, reachable: false, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);
        transport.set_server("host", 1883).unwrap();

        assert_eq!(transport.connect("id", "u", "p"), Err(Error::NotOpen));
        assert!(!transport.connected());
        assert_eq!(transport.state(), state::CONNECT_FAILED);
    }

    #[test]
    fn test_refusal_code_becomes_state() {
        let wire = wire_with(&[0x20, 0x02, 0x00, 0x04]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);
        transport.set_server("host", 1883).unwrap();

        assert_eq!(transport.connect("id", "u", "p"), Err(Error::ConnectionRefused(4)));
        assert_eq!(transport.state(), state::BAD_CREDENTIALS);
    }

    #[test]
    fn test_silent_broker_times_out() {
        let wire = wire_with(&[0x20]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);
        transport.set_server("host", 1883).unwrap();

        assert_eq!(transport.connect("id", "u", "p"), Err(Error::Timeout));
        assert_eq!(transport.state(), state::CONNECTION_TIMEOUT);
    }

    #[test]
    fn test_packet_cut_short_drops_session() {
        let wire = wire_with(&[0x20, 0x02, 0x00, 0x00, 0x30, 0x05, 0x00]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);
        transport.set_server("host", 1883).unwrap();
        transport.connect("id", "u", "p").unwrap();

        assert_eq!(transport.poll(0), Err(Error::Timeout));
        assert!(!transport.connected());
        assert_eq!(transport.state(), state::CONNECTION_LOST);
    }

    #[test]
    fn test_connect_without_server_fails() {
        let wire = wire_with(&[]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);

        assert_eq!(transport.connect("id", "u", "p"), Err(Error::InvalidAddress));
        assert_eq!(transport.state(), state::CONNECT_FAILED);
    }

    #[test]
    fn test_publish_while_disconnected() {
        let wire = wire_with(&[]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);

        assert_eq!(transport.publish("t", b"x"), Err(Error::NotOpen));
        assert_eq!(transport.poll(0), Ok(None));
    }

    #[test]
    fn test_poll_sends_ping_after_keep_alive() {
        let wire = wire_with(&[0x20, 0x02, 0x00, 0x00]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 1);
        transport.set_server("host", 1883).unwrap();
        transport.connect("id", "u", "p").unwrap();
        let after_connect = wire.borrow().outbound.len();

        assert_eq!(transport.poll(u32::MAX - 200), Ok(None));
        assert_eq!(wire.borrow().outbound.len(), after_connect);

        // 1000 ms later, across the clock wrap.
        assert_eq!(transport.poll(799), Ok(None));
        let wire = wire.borrow();
        assert_eq!(&wire.outbound[after_connect..], &[0xC0, 0x00]);
    }

    #[test]
    fn test_disconnect_resets_state() {
        let wire = wire_with(&[0x20, 0x02, 0x00, 0x00]);
        let net = Net { wire: &wire, reachable: true, last_remote: String::new() };
        let mut transport = MqttTransport::new(net, 60);
        transport.set_server("host", 1883).unwrap();
        transport.connect("id", "u", "p").unwrap();

        transport.disconnect().unwrap();
        assert!(!transport.connected());
        assert_eq!(transport.state(), state::DISCONNECTED);
        assert!(wire.borrow().outbound.ends_with(&[0xE0, 0x00]));
    }
}
