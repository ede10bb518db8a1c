//! Mock transport and platform for session tests

#![allow(dead_code)]

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thinglink::thing::transport::state;
use thinglink::thing::{Config, DeviceIdentity, Message, Platform, Session, Transport};

pub const PRODUCT_ID: &str = "ABC123";
pub const DEVICE_NAME: &str = "dev1";
/// "secret-key-123456"
pub const SECRET: &str = "c2VjcmV0LWtleS0xMjM0NTY=";

pub const PROPERTY_UP: &str = "$thing/up/property/ABC123/dev1";
pub const PROPERTY_DOWN: &str = "$thing/down/property/ABC123/dev1";
pub const EVENT_UP: &str = "$thing/up/event/ABC123/dev1";
pub const ACTION_UP: &str = "$thing/up/action/ABC123/dev1";
pub const ACTION_DOWN: &str = "$thing/down/action/ABC123/dev1";

/// Records everything the session asks of the MQTT client
#[derive(Debug)]
pub struct MockTransport {
    pub server: Option<(String, u16)>,
    /// Whether the next connect attempts succeed
    pub accept: bool,
    pub connected: bool,
    pub state: i8,
    pub logins: Vec<(String, String, String)>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub inbound: VecDeque<(String, Vec<u8>)>,
    pub fail_publish: bool,
    pub polls: usize,
}

impl MockTransport {
    pub fn new(accept: bool) -> Self {
        Self {
            server: None,
            accept,
            connected: false,
            state: state::DISCONNECTED,
            logins: Vec::new(),
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbound: VecDeque::new(),
            fail_publish: false,
            polls: 0,
        }
    }

    /// Queue a message for the next poll
    pub fn deliver(&mut self, topic: &str, payload: &str) {
        self.inbound.push_back((topic.to_string(), payload.as_bytes().to_vec()));
    }

    /// Simulate the broker dropping the session
    pub fn drop_session(&mut self) {
        self.connected = false;
        self.state = state::CONNECTION_LOST;
    }

    pub fn published_on(&self, topic: &str) -> Vec<&str> {
        self.published
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, payload)| payload.as_str())
            .collect()
    }
}

impl Transport for MockTransport {
    type Error = ();

    fn set_server(&mut self, host: &str, port: u16) -> Result<(), ()> {
        self.server = Some((host.to_string(), port));
        Ok(())
    }

    fn connect(&mut self, client_id: &str, username: &str, password: &str) -> Result<(), ()> {
        self.logins
            .push((client_id.to_string(), username.to_string(), password.to_string()));
        self.connected = self.accept;
        if self.accept {
            self.state = state::CONNECTED;
            Ok(())
        } else {
            self.state = state::CONNECT_FAILED;
            Err(())
        }
    }

    fn connected(&self) -> bool {
        self.connected
    }

    fn state(&self) -> i8 {
        self.state
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), ()> {
        if self.fail_publish {
            return Err(());
        }
        let payload = String::from_utf8(payload.to_vec()).map_err(|_| ())?;
        self.published.push((topic.to_string(), payload));
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), ()> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn poll(&mut self, _now_ms: u32) -> Result<Option<Message>, ()> {
        self.polls += 1;
        let Some((topic, payload)) = self.inbound.pop_front() else {
            return Ok(None);
        };
        Ok(Some(Message {
            topic: heapless::String::try_from(topic.as_str()).map_err(|_| ())?,
            payload: heapless::Vec::from_slice(&payload).map_err(|_| ())?,
        }))
    }
}

/// Manually driven clock with a seeded random source
#[derive(Debug)]
pub struct MockPlatform {
    pub now: u32,
    pub restarts: usize,
    /// Values handed out by `random()` before falling back to the generator
    pub scripted: VecDeque<u32>,
    rng: StdRng,
}

impl MockPlatform {
    pub fn new(now: u32) -> Self {
        Self {
            now,
            restarts: 0,
            scripted: VecDeque::new(),
            rng: StdRng::seed_from_u64(7),
        }
    }

    pub fn with_random(now: u32, values: &[u32]) -> Self {
        let mut platform = Self::new(now);
        platform.scripted.extend(values.iter().copied());
        platform
    }
}

impl Platform for MockPlatform {
    fn now_ms(&self) -> u32 {
        self.now
    }

    fn random(&mut self) -> u32 {
        self.scripted.pop_front().unwrap_or_else(|| self.rng.r#gen())
    }

    fn restart(&mut self) {
        self.restarts += 1;
    }
}

pub fn identity() -> DeviceIdentity {
    DeviceIdentity::new(PRODUCT_ID, DEVICE_NAME, SECRET).unwrap()
}

/// A session with default config over the given mocks
pub fn session<'h>(transport: MockTransport, platform: MockPlatform) -> Session<'h, MockTransport, MockPlatform> {
    Session::begin(transport, platform, identity(), Config::default()).unwrap()
}

/// Advance the clock by `ms` and run one tick
pub fn advance<'h>(
    session: &mut Session<'h, MockTransport, MockPlatform>,
    ms: u32,
) -> Result<(), thinglink::thing::Error> {
    let platform = session.platform_mut();
    platform.now = platform.now.wrapping_add(ms);
    session.tick()
}
