//! Device identity and MQTT login derivation.
//!
//! The broker authenticates a device with a user name that names the
//! device, a random connection id and an expiry, and a password that is the
//! HMAC-SHA256 of that user name under the device secret:
//!
//! ```text
//! client id = {product_id}{device_name}
//! user name = {client id};{app id};{connection id};{expiry}
//! password  = HEX(HMAC-SHA256(secret, user name));hmacsha256
//! ```

use core::fmt::Write as _;

use base64ct::{Base64, Encoding};
use heapless::{String, Vec};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::Error;
use super::platform::{Platform, draw};

type HmacSha256 = Hmac<Sha256>;

/// Longest product id or device name.
pub const MAX_ID_LEN: usize = 64;
/// Longest decoded device secret, in bytes.
pub const MAX_SECRET_LEN: usize = 64;

const MAX_CLIENT_ID_LEN: usize = 2 * MAX_ID_LEN;
const MAX_USERNAME_LEN: usize = 192;
const MAX_PASSWORD_LEN: usize = 96;

const SIGNATURE_SUFFIX: &str = ";hmacsha256";

/// Connection ids are drawn from `[10000, 99999)`.
const CONNECTION_ID_MIN: u32 = 10_000;
const CONNECTION_ID_MAX: u32 = 99_999;

/// Who the device is, as registered with the platform.
///
/// The secret is decoded once here; it never leaves the struct and is
/// redacted from `Debug` output.
#[derive(Clone)]
pub struct DeviceIdentity {
    product_id: String<MAX_ID_LEN>,
    device_name: String<MAX_ID_LEN>,
    secret: Vec<u8, MAX_SECRET_LEN>,
}

impl DeviceIdentity {
    /// Build an identity from the values shown in the device console.
    ///
    /// # Errors
    ///
    /// * [`Error::IdentifierTooLong`] - product id or device name over [`MAX_ID_LEN`] bytes
    /// * [`Error::InvalidSecret`] - secret is empty, not base64, or over [`MAX_SECRET_LEN`] bytes decoded
    pub fn new(product_id: &str, device_name: &str, secret_base64: &str) -> Result<Self, Error> {
        let product_id = String::try_from(product_id).map_err(|_| Error::IdentifierTooLong)?;
        let device_name = String::try_from(device_name).map_err(|_| Error::IdentifierTooLong)?;

        let mut buf = [0u8; MAX_SECRET_LEN];
        let decoded = Base64::decode(secret_base64.trim(), &mut buf).map_err(|_| Error::InvalidSecret)?;
        if decoded.is_empty() {
            return Err(Error::InvalidSecret);
        }
        let secret = Vec::from_slice(decoded).map_err(|_| Error::InvalidSecret)?;

        Ok(Self {
            product_id,
            device_name,
            secret,
        })
    }

    /// Product id.
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

impl core::fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("product_id", &self.product_id)
            .field("device_name", &self.device_name)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A signed MQTT login.
///
/// User name and password are only ever produced together by
/// [`Credentials::derive`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String<MAX_CLIENT_ID_LEN>,
    username: String<MAX_USERNAME_LEN>,
    password: String<MAX_PASSWORD_LEN>,
    connection_id: u32,
    expiry: u32,
}

impl Credentials {
    /// Derive the login for `identity`.
    ///
    /// The result depends only on the arguments: the same connection id and
    /// expiry always yield the same password.
    ///
    /// ```rust
    /// use thinglink::thing::{Credentials, DeviceIdentity};
    ///
    /// let identity = DeviceIdentity::new("ABC123", "dev1", "c2VjcmV0LWtleS0xMjM0NTY=").unwrap();
    /// let credentials = Credentials::derive(&identity, "12010126", 12345, 1924963199).unwrap();
    ///
    /// assert_eq!(credentials.client_id(), "ABC123dev1");
    /// assert_eq!(credentials.username(), "ABC123dev1;12010126;12345;1924963199");
    /// assert!(credentials.password().ends_with(";hmacsha256"));
    /// ```
    pub fn derive(identity: &DeviceIdentity, app_id: &str, connection_id: u32, expiry: u32) -> Result<Self, Error> {
        let mut client_id = String::new();
        write!(client_id, "{}{}", identity.product_id, identity.device_name)
            .map_err(|_| Error::IdentifierTooLong)?;

        let mut username = String::new();
        write!(username, "{};{};{};{}", client_id, app_id, connection_id, expiry)
            .map_err(|_| Error::IdentifierTooLong)?;

        let password = sign(&identity.secret, &username)?;

        Ok(Self {
            client_id,
            username,
            password,
            connection_id,
            expiry,
        })
    }

    /// Derive with a connection id drawn from the platform random source.
    pub fn derive_random<P: Platform + ?Sized>(
        identity: &DeviceIdentity,
        app_id: &str,
        expiry: u32,
        platform: &mut P,
    ) -> Result<Self, Error> {
        let connection_id = draw(platform, CONNECTION_ID_MIN, CONNECTION_ID_MAX);
        Self::derive(identity, app_id, connection_id, expiry)
    }

    /// MQTT client identifier.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// MQTT user name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// MQTT password.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Connection id embedded in the user name.
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Expiry embedded in the user name, in Unix seconds.
    pub fn expiry(&self) -> u32 {
        self.expiry
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn sign(secret: &[u8], message: &str) -> Result<String<MAX_PASSWORD_LEN>, Error> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::InvalidSecret)?;
    mac.update(message.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut digits = [0u8; 64];
    hex::encode_to_slice(digest, &mut digits).map_err(|_| Error::PayloadTooLarge)?;
    digits.make_ascii_uppercase();
    let digits = core::str::from_utf8(&digits).map_err(|_| Error::PayloadTooLarge)?;

    let mut password = String::new();
    password.push_str(digits).map_err(|_| Error::PayloadTooLarge)?;
    password
        .push_str(SIGNATURE_SUFFIX)
        .map_err(|_| Error::PayloadTooLarge)?;
    Ok(password)
}
