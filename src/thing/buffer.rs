//! Coalescing buffer for outgoing property values.
//!
//! Property updates are collected by key and published together as one
//! `report` once the flush interval has passed. A key written twice before
//! a flush keeps only its latest value.

use heapless::{String, Vec};
use serde::Serialize;

use super::Error;
use super::credentials::MAX_ID_LEN;
use super::envelope::MAX_PAYLOAD_LEN;
use super::json::validate_value;
use super::platform::{Platform, elapsed};
use super::publisher::Publisher;
use super::transport::Transport;

/// Default number of distinct pending properties.
pub const DEFAULT_PROPERTIES: usize = 10;

/// Longest rendered property value.
pub const MAX_VALUE_LEN: usize = 128;

/// A key rendered as a JSON string. Control characters take six bytes.
const MAX_QUOTED_KEY_LEN: usize = MAX_ID_LEN * 6 + 2;

/// Bytes a report adds around its params, with the longest client token.
const REPORT_OVERHEAD: usize = r#"{"method":"report","clientToken":"99999","params":}"#.len();

/// Longest params object a single report can carry.
pub const MAX_PROPERTIES_LEN: usize = MAX_PAYLOAD_LEN - REPORT_OVERHEAD;

#[derive(Debug, Clone)]
struct Pending {
    key: String<MAX_ID_LEN>,
    quoted_len: usize,
    value: String<MAX_VALUE_LEN>,
}

impl Pending {
    /// Bytes of `"key":value` in the rendered object.
    fn rendered_len(&self) -> usize {
        self.quoted_len + 1 + self.value.len()
    }
}

/// Pending property values, keyed by property id.
///
/// ```rust
/// use thinglink::thing::PropertyBuffer;
///
/// let mut buffer: PropertyBuffer<4> = PropertyBuffer::new(0);
/// buffer.put_value("power", &1).unwrap();
/// buffer.put_value("mode", "eco").unwrap();
/// buffer.put_value("power", &0).unwrap();
///
/// assert_eq!(buffer.render().unwrap().as_str(), r#"{"power":0,"mode":"eco"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct PropertyBuffer<const N: usize = DEFAULT_PROPERTIES> {
    entries: Vec<Pending, N>,
    last_flush: u32,
}

impl<const N: usize> PropertyBuffer<N> {
    /// An empty buffer whose flush timer starts at `now`.
    pub const fn new(now: u32) -> Self {
        Self {
            entries: Vec::new(),
            last_flush: now,
        }
    }

    /// Store an already rendered JSON value under `key`.
    ///
    /// The pending values always fit one report: a value that would push
    /// the rendered object past [`MAX_PROPERTIES_LEN`] is refused and the
    /// buffer is left as it was.
    ///
    /// # Errors
    ///
    /// * [`Error::Malformed`] - `rendered` is not a single JSON value
    /// * [`Error::PayloadTooLarge`] - key or value does not fit
    /// * [`Error::BufferFull`] - `key` is new and all `N` slots are taken, or
    ///   the report would grow too large; the value is dropped
    pub fn put(&mut self, key: &str, rendered: &str) -> Result<(), Error> {
        validate_value(rendered)?;
        let value = String::try_from(rendered.trim()).map_err(|_| Error::PayloadTooLarge)?;
        let key: String<MAX_ID_LEN> = String::try_from(key).map_err(|_| Error::PayloadTooLarge)?;
        let quoted_len = quote(&key)?.len();
        let pending = Pending { key, quoted_len, value };

        let slot = self.entries.iter().position(|entry| entry.key == pending.key);
        let replaced = slot.map_or(0, |i| self.entries[i].rendered_len());
        let commas = match slot {
            Some(_) => self.entries.len().saturating_sub(1),
            None => self.entries.len(),
        };
        let body: usize = self.entries.iter().map(Pending::rendered_len).sum();
        let total = 2 + commas + body - replaced + pending.rendered_len();
        if total > MAX_PROPERTIES_LEN {
            warn!("property report full, value dropped");
            return Err(Error::BufferFull);
        }

        match slot {
            Some(i) => {
                self.entries[i] = pending;
                Ok(())
            }
            None => self.entries.push(pending).map_err(|_| {
                warn!("property buffer full, value dropped");
                Error::BufferFull
            }),
        }
    }

    /// Serialize `value` and store it under `key`.
    pub fn put_value<V: Serialize + ?Sized>(&mut self, key: &str, value: &V) -> Result<(), Error> {
        let rendered: String<MAX_VALUE_LEN> =
            serde_json_core::to_string(value).map_err(|_| Error::PayloadTooLarge)?;
        self.put(key, &rendered)
    }

    /// The rendered value pending for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    /// Number of pending keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of distinct keys.
    pub fn capacity(&self) -> usize {
        N
    }

    /// When the buffer was last flushed.
    pub fn last_flush(&self) -> u32 {
        self.last_flush
    }

    /// Render the pending values as one JSON object, in insertion order.
    pub fn render(&self) -> Result<String<MAX_PAYLOAD_LEN>, Error> {
        let mut out = String::new();
        out.push('{').map_err(|_| Error::PayloadTooLarge)?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(',').map_err(|_| Error::PayloadTooLarge)?;
            }
            out.push_str(&quote(&entry.key)?).map_err(|_| Error::PayloadTooLarge)?;
            out.push(':').map_err(|_| Error::PayloadTooLarge)?;
            out.push_str(&entry.value).map_err(|_| Error::PayloadTooLarge)?;
        }
        out.push('}').map_err(|_| Error::PayloadTooLarge)?;
        Ok(out)
    }

    /// Whether a flush is due: something is pending and more than
    /// `interval_ms` passed since the last flush.
    pub fn due(&self, now: u32, interval_ms: u32) -> bool {
        !self.entries.is_empty() && elapsed(now, self.last_flush) > interval_ms
    }

    /// Drop all pending values.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Publish and clear the pending values if a flush is due.
    ///
    /// Returns `Ok(true)` when a report was published. While the transport
    /// is down the values are kept for a later attempt; any other failure
    /// drops them and restarts the flush timer.
    pub fn tick<T: Transport, P: Platform>(
        &mut self,
        now: u32,
        interval_ms: u32,
        publisher: &mut Publisher<'_, T, P>,
    ) -> Result<bool, Error> {
        if !self.due(now, interval_ms) {
            return Ok(false);
        }
        self.flush(now, publisher)
    }

    /// Publish and clear the pending values now, if there are any.
    pub fn flush<T: Transport, P: Platform>(
        &mut self,
        now: u32,
        publisher: &mut Publisher<'_, T, P>,
    ) -> Result<bool, Error> {
        if self.entries.is_empty() {
            return Ok(false);
        }

        let result = self
            .render()
            .and_then(|params| publisher.send_properties(&params));
        if result == Err(Error::NotConnected) {
            return Err(Error::NotConnected);
        }

        self.entries.clear();
        self.last_flush = now;
        result.map(|()| true)
    }
}

fn quote(key: &str) -> Result<String<MAX_QUOTED_KEY_LEN>, Error> {
    serde_json_core::to_string(key).map_err(|_| Error::PayloadTooLarge)
}

impl<const N: usize> Default for PropertyBuffer<N> {
    fn default() -> Self {
        Self::new(0)
    }
}
