//! Session configuration.

/// Signature expiry used when none is given: 2030-12-31 23:59:59 UTC.
pub const DEFAULT_EXPIRY: u32 = 1_924_963_199;

/// Platform application id embedded in the MQTT user name.
pub const DEFAULT_APP_ID: &str = "12010126";

/// Broker host suffix; the host is `{product_id}.{suffix}`.
pub const DEFAULT_DOMAIN_SUFFIX: &str = "iotcloud.tencentdevices.com";

/// Plain MQTT port of the broker.
pub const MQTT_PORT: u16 = 1883;

/// Tunables of a [`Session`](super::Session).
///
/// Every field has a sensible default; override only what differs.
///
/// ```rust
/// use thinglink::thing::Config;
///
/// let config = Config {
///     flush_interval_ms: 2_000,
///     ..Config::default()
/// };
/// assert_eq!(config.port, 1883);
/// assert_eq!(config.max_connect_failures, 5);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Broker port.
    pub port: u16,
    /// MQTT keep-alive announced by transports built from this config.
    pub keep_alive_seconds: u16,
    /// Application id placed in the user name.
    pub app_id: &'static str,
    /// Broker host suffix appended to the product id.
    pub domain_suffix: &'static str,
    /// Unix time (seconds) at which the derived password stops being valid.
    pub expiry: u32,
    /// How often the connection is checked and, if needed, re-established.
    pub health_check_interval_ms: u32,
    /// Consecutive failed connects tolerated before the device is restarted.
    pub max_connect_failures: u32,
    /// Minimum time between two flushes of the property buffer.
    pub flush_interval_ms: u32,
    /// Answer `control` messages on the property-down topic with a `control_reply`.
    pub control_reply: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: MQTT_PORT,
            keep_alive_seconds: 60,
            app_id: DEFAULT_APP_ID,
            domain_suffix: DEFAULT_DOMAIN_SUFFIX,
            expiry: DEFAULT_EXPIRY,
            health_check_interval_ms: 10_000,
            max_connect_failures: 5,
            flush_interval_ms: 5_000,
            control_reply: false,
        }
    }
}
