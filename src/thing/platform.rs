//! Host services the session depends on.

/// Platform-specific functionality used by the session.
///
/// This trait must be implemented by the target platform, much like the
/// board support a firmware image is linked against.
pub trait Platform {
    /// Milliseconds from a monotonic clock.
    ///
    /// The counter may wrap around; the session only ever looks at
    /// differences computed with wrapping arithmetic.
    fn now_ms(&self) -> u32;

    /// A pseudo-random number. It only needs to be distinguishing, not
    /// cryptographically strong.
    fn random(&mut self) -> u32;

    /// Restart the device.
    ///
    /// Called after too many consecutive failed connection attempts. On
    /// real hardware this does not return.
    fn restart(&mut self);
}

/// Milliseconds elapsed from `since` to `now` on a wrapping counter.
///
/// Correct as long as the real interval is shorter than one full wrap
/// (about 49.7 days for a `u32` millisecond counter).
pub fn elapsed(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

/// Uniform-ish draw from `[low, high)` using one `random()` value.
pub(crate) fn draw<P: Platform + ?Sized>(platform: &mut P, low: u32, high: u32) -> u32 {
    low + platform.random() % (high - low)
}
