//! The device session.

use serde::Serialize;

use super::buffer::{DEFAULT_PROPERTIES, PropertyBuffer};
use super::config::Config;
use super::credentials::{Credentials, DeviceIdentity};
use super::dispatcher::{Outcome, dispatch};
use super::envelope::EventType;
use super::platform::{Platform, elapsed};
use super::publisher::Publisher;
use super::registry::{CallbackRegistry, DEFAULT_CALLBACKS, Handler, Kind};
use super::topics::{TopicSet, broker_host};
use super::transport::Transport;
use super::Error;

/// Inbound messages handled per [`Session::tick`] at most.
pub const MAX_MESSAGES_PER_TICK: usize = 8;

/// One device's connection to the broker.
///
/// The session owns the transport and the platform, keeps the connection
/// alive, routes inbound messages to bound handlers and batches property
/// reports. Drive it by calling [`Session::tick`] from the main loop.
///
/// `CALLBACKS` and `PROPERTIES` size the callback table and the property
/// buffer.
pub struct Session<
    'h,
    T: Transport,
    P: Platform,
    const CALLBACKS: usize = DEFAULT_CALLBACKS,
    const PROPERTIES: usize = DEFAULT_PROPERTIES,
> {
    transport: T,
    platform: P,
    config: Config,
    identity: DeviceIdentity,
    credentials: Credentials,
    topics: TopicSet,
    registry: CallbackRegistry<'h, CALLBACKS>,
    buffer: PropertyBuffer<PROPERTIES>,
    failures: u32,
    last_health_check: u32,
}

impl<'h, T: Transport, P: Platform> Session<'h, T, P> {
    /// Start a session with the default table sizes.
    ///
    /// Derives topics and credentials, points the transport at the broker
    /// and makes the first connection attempt. A failed attempt is only
    /// counted; [`Session::tick`] keeps retrying.
    ///
    /// # Errors
    ///
    /// * [`Error::IdentifierTooLong`] - a topic, host or credential does not fit
    /// * [`Error::Transport`] - the transport rejected the broker address
    pub fn begin(transport: T, platform: P, identity: DeviceIdentity, config: Config) -> Result<Self, Error> {
        Self::begin_sized(transport, platform, identity, config)
    }
}

impl<'h, T: Transport, P: Platform, const CALLBACKS: usize, const PROPERTIES: usize>
    Session<'h, T, P, CALLBACKS, PROPERTIES>
{
    /// [`Session::begin`] with explicit table sizes.
    pub fn begin_sized(
        mut transport: T,
        mut platform: P,
        identity: DeviceIdentity,
        config: Config,
    ) -> Result<Self, Error> {
        let topics = TopicSet::new(identity.product_id(), identity.device_name())?;
        let host = broker_host(identity.product_id(), config.domain_suffix)?;
        let credentials = Credentials::derive_random(&identity, config.app_id, config.expiry, &mut platform)?;

        transport.set_server(&host, config.port).map_err(|_| Error::Transport)?;

        let now = platform.now_ms();
        let mut session = Self {
            transport,
            platform,
            config,
            identity,
            credentials,
            topics,
            registry: CallbackRegistry::new(),
            buffer: PropertyBuffer::new(now),
            failures: 0,
            last_health_check: now,
        };
        session.connect();
        Ok(session)
    }

    /// Try to open the broker session with the current credentials.
    ///
    /// On success the failure count is reset and the property-down and
    /// action-down topics are subscribed. On failure the count goes up.
    pub fn connect(&mut self) -> bool {
        info!("mqtt connecting");
        let credentials = &self.credentials;
        let connected = self
            .transport
            .connect(credentials.client_id(), credentials.username(), credentials.password())
            .is_ok();

        if !connected {
            self.failures = self.failures.saturating_add(1);
            warn!("mqtt connect failed, state {}", self.transport.state());
            return false;
        }

        info!("mqtt connected");
        self.failures = 0;
        for topic in [self.topics.property_down(), self.topics.action_down()] {
            if self.transport.subscribe(topic).is_err() {
                warn!("subscribe failed");
            }
        }
        true
    }

    /// Reconnect if needed, restarting the device after too many failures.
    ///
    /// Runs from [`Session::tick`] every `health_check_interval_ms`. When
    /// more than `max_connect_failures` attempts in a row have failed, the
    /// count is reset and [`Platform::restart`] is invoked.
    pub fn check_health(&mut self) {
        if self.transport.connected() {
            self.failures = 0;
            return;
        }

        if !self.connect() && self.failures > self.config.max_connect_failures {
            error!("giving up after {} connect failures, restarting", self.failures);
            self.failures = 0;
            self.platform.restart();
        }
    }

    /// Run one iteration of the session.
    ///
    /// Handles pending inbound messages, checks the connection when the
    /// health-check interval has passed and flushes buffered properties
    /// when the flush interval has passed. Only the flush can fail;
    /// `Err(NotConnected)` means the values are kept for later.
    pub fn tick(&mut self) -> Result<(), Error> {
        let now = self.platform.now_ms();
        self.service(now);

        if elapsed(now, self.last_health_check) >= self.config.health_check_interval_ms {
            self.last_health_check = now;
            self.check_health();
        }

        let interval = self.config.flush_interval_ms;
        let mut publisher = Publisher::new(&mut self.transport, &mut self.platform, &self.topics);
        self.buffer.tick(now, interval, &mut publisher).map(|_| ())
    }

    /// Route one inbound message as if the transport had delivered it.
    pub fn handle_message(&mut self, topic: &str, payload: &[u8]) -> Outcome {
        let mut publisher = Publisher::new(&mut self.transport, &mut self.platform, &self.topics);
        dispatch(
            &mut self.registry,
            &mut publisher,
            self.config.control_reply,
            topic,
            payload,
        )
    }

    /// Report a JSON object of properties right away.
    pub fn send_properties(&mut self, params: &str) -> Result<(), Error> {
        self.publisher().send_properties(params)
    }

    /// Buffer one property value for the next periodic report.
    ///
    /// ```rust,ignore
    /// session.send_property("power", &1)?;
    /// session.send_property("mode", "eco")?;
    /// ```
    pub fn send_property<V: Serialize + ?Sized>(&mut self, id: &str, value: &V) -> Result<(), Error> {
        self.buffer.put_value(id, value)
    }

    /// Report buffered properties now instead of waiting for the timer.
    ///
    /// Returns `Ok(false)` when nothing was pending.
    pub fn flush_properties(&mut self) -> Result<bool, Error> {
        let now = self.platform.now_ms();
        let mut publisher = Publisher::new(&mut self.transport, &mut self.platform, &self.topics);
        self.buffer.flush(now, &mut publisher)
    }

    /// Post an event with a JSON object of parameters.
    pub fn send_event(&mut self, event_id: &str, params: &str, event_type: EventType) -> Result<(), Error> {
        self.publisher().send_event(event_id, params, event_type)
    }

    /// Run `handler` when a property-down message sets `id`.
    pub fn bind_property(&mut self, id: &str, handler: &'h mut dyn Handler) -> Result<(), Error> {
        self.registry.bind(id, Kind::Property, handler)
    }

    /// Run `handler` when the cloud invokes action `id`.
    pub fn bind_action(&mut self, id: &str, handler: &'h mut dyn Handler) -> Result<(), Error> {
        self.registry.bind(id, Kind::Action, handler)
    }

    /// Derive fresh credentials valid until `expiry`.
    ///
    /// A new connection id is drawn. The current broker session is kept;
    /// the credentials are used from the next connection attempt on.
    pub fn rotate_credentials(&mut self, expiry: u32) -> Result<(), Error> {
        self.credentials =
            Credentials::derive_random(&self.identity, self.config.app_id, expiry, &mut self.platform)?;
        Ok(())
    }

    /// Whether the broker session is up.
    pub fn is_connected(&self) -> bool {
        self.transport.connected()
    }

    /// Failed connection attempts since the last success or restart.
    pub fn failure_count(&self) -> u32 {
        self.failures
    }

    /// Current login.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The device's topics.
    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// The device identity.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// The session configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Properties waiting for the next report.
    pub fn pending_properties(&self) -> &PropertyBuffer<PROPERTIES> {
        &self.buffer
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The platform.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// The platform, mutably.
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    fn publisher(&mut self) -> Publisher<'_, T, P> {
        Publisher::new(&mut self.transport, &mut self.platform, &self.topics)
    }

    fn service(&mut self, now: u32) {
        for _ in 0..MAX_MESSAGES_PER_TICK {
            if !self.transport.connected() {
                break;
            }
            match self.transport.poll(now) {
                Ok(Some(message)) => {
                    self.handle_message(&message.topic, &message.payload);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("transport poll failed");
                    break;
                }
            }
        }
    }
}

impl<T: Transport, P: Platform, const CALLBACKS: usize, const PROPERTIES: usize> core::fmt::Debug
    for Session<'_, T, P, CALLBACKS, PROPERTIES>
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("credentials", &self.credentials)
            .field("connected", &self.transport.connected())
            .field("failures", &self.failures)
            .field("callbacks", &self.registry)
            .field("pending", &self.buffer.len())
            .finish()
    }
}
