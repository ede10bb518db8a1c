//! Error type for the thing-model session.

/// Errors reported by the thing-model layer.
///
/// Configuration problems (`InvalidSecret`, `IdentifierTooLong`) surface at
/// construction time. Capacity problems are always reported, even where the
/// data itself is dropped.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The device secret is not valid base64, is empty, or is too long.
    InvalidSecret,
    /// A product id, device name, topic or credential does not fit its buffer.
    IdentifierTooLong,
    /// The transport has no established broker session.
    NotConnected,
    /// The transport rejected a publish, subscribe or setup call.
    Transport,
    /// Caller-supplied JSON is not a well-formed object or value.
    Malformed,
    /// A payload or rendered value does not fit its fixed-size buffer.
    PayloadTooLarge,
    /// The callback table is full.
    RegistryFull,
    /// A handler is already bound to this identifier.
    DuplicateId,
    /// The property buffer is full and the key is not already buffered.
    BufferFull,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::InvalidSecret => defmt::write!(f, "InvalidSecret"),
            Error::IdentifierTooLong => defmt::write!(f, "IdentifierTooLong"),
            Error::NotConnected => defmt::write!(f, "NotConnected"),
            Error::Transport => defmt::write!(f, "Transport"),
            Error::Malformed => defmt::write!(f, "Malformed"),
            Error::PayloadTooLarge => defmt::write!(f, "PayloadTooLarge"),
            Error::RegistryFull => defmt::write!(f, "RegistryFull"),
            Error::DuplicateId => defmt::write!(f, "DuplicateId"),
            Error::BufferFull => defmt::write!(f, "BufferFull"),
        }
    }
}
