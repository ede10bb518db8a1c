//! The MQTT capability the session drives.

pub use crate::network::application::mqtt::PublishPacket as Message;

/// Connection state codes, numbered the way PubSubClient reports them.
///
/// Negative values are local conditions; positive values are CONNACK
/// return codes sent by the broker.
pub mod state {
    /// The broker did not answer in time.
    pub const CONNECTION_TIMEOUT: i8 = -4;
    /// An established session broke.
    pub const CONNECTION_LOST: i8 = -3;
    /// The network connection could not be opened.
    pub const CONNECT_FAILED: i8 = -2;
    /// No session; nothing went wrong yet.
    pub const DISCONNECTED: i8 = -1;
    /// Session established.
    pub const CONNECTED: i8 = 0;
    /// Broker refused the protocol version.
    pub const BAD_PROTOCOL: i8 = 1;
    /// Broker refused the client id.
    pub const BAD_CLIENT_ID: i8 = 2;
    /// Broker unavailable.
    pub const UNAVAILABLE: i8 = 3;
    /// Broker rejected user name or password.
    pub const BAD_CREDENTIALS: i8 = 4;
    /// Client not authorized.
    pub const UNAUTHORIZED: i8 = 5;
}

/// An MQTT 3.1.1 client as seen by the session.
///
/// All traffic is QoS 0. Implementations own the network stack and keep
/// the session alive from [`Transport::poll`].
pub trait Transport {
    /// Error reported by the underlying client.
    type Error: core::fmt::Debug;

    /// Set the broker address used by later [`Transport::connect`] calls.
    fn set_server(&mut self, host: &str, port: u16) -> Result<(), Self::Error>;

    /// Open a session with the given credentials.
    ///
    /// Any previous session is dropped first.
    fn connect(&mut self, client_id: &str, username: &str, password: &str) -> Result<(), Self::Error>;

    /// Whether a session is currently established.
    fn connected(&self) -> bool;

    /// The last connection state code; see [`state`].
    fn state(&self) -> i8;

    /// Publish `payload` on `topic` at QoS 0.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error>;

    /// Subscribe to `topic` at QoS 0.
    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error>;

    /// Service the session and return at most one inbound message.
    ///
    /// `now_ms` is the caller's wrapping millisecond clock, used for
    /// keep-alive bookkeeping.
    fn poll(&mut self, now_ms: u32) -> Result<Option<Message>, Self::Error>;
}
