use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// A frame-timing timestamp: milliseconds since the frame clock's origin.
///
/// Mirrors the high-resolution timestamp handed to animation-frame callbacks,
/// so fractional milliseconds are preserved.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp {
    millis: f64,
}

impl Timestamp {
    /// Create a timestamp from milliseconds. Negative values clamp to zero.
    pub fn from_millis(ms: f64) -> Self {
        Self {
            millis: if ms.is_finite() { ms.max(0.0) } else { 0.0 },
        }
    }

    /// Create a timestamp from a std duration measured from the clock origin.
    pub fn from_elapsed(elapsed: std::time::Duration) -> Self {
        Self::from_millis(elapsed.as_secs_f64() * 1000.0)
    }

    /// The clock origin.
    pub fn zero() -> Self {
        Self { millis: 0.0 }
    }

    pub fn as_millis(&self) -> f64 {
        self.millis
    }

    pub fn as_seconds(&self) -> f64 {
        self.millis / 1000.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::zero()
    }
}

impl Add<f64> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs_ms: f64) -> Timestamp {
        Timestamp::from_millis(self.millis + rhs_ms)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_ms = self.millis as u64;
        let hours = total_ms / 3_600_000;
        let minutes = (total_ms % 3_600_000) / 60_000;
        let secs = (total_ms % 60_000) / 1_000;
        let ms = total_ms % 1_000;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
    }
}
