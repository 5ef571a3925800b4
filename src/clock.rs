//! Monotonic clock adapter
//!
//! Converts the platform's raw monotonic tick counter into nanoseconds and
//! milliseconds. The conversion ratio (the clock basis) is queried from the
//! platform once and cached; the ratio is constant for the process lifetime,
//! so re-deriving it is always safe.
//!
//! The cache is a single `AtomicU64` packing numerator and denominator, which
//! keeps conversions lock-free on the module-load hot path and lets the
//! test-only reset clear the cache without taking any lock.

use crate::platform::HostPlatform;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tick-rate descriptor: `ticks * numer / denom` yields nanoseconds.
///
/// `denom` is always nonzero once initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClockBasis {
    pub numer: u32,
    pub denom: u32,
}

impl ClockBasis {
    /// 1:1 basis, for platforms whose tick already is a nanosecond.
    pub const IDENTITY: ClockBasis = ClockBasis { numer: 1, denom: 1 };

    fn pack(self) -> u64 {
        (u64::from(self.numer) << 32) | u64::from(self.denom)
    }

    #[allow(clippy::cast_possible_truncation)] // intentional 32-bit halves
    fn unpack(raw: u64) -> Self {
        ClockBasis { numer: (raw >> 32) as u32, denom: raw as u32 }
    }
}

/// Tick→time converter with a lazily initialized, cached basis.
#[derive(Debug)]
pub struct MonotonicClock {
    /// Packed `ClockBasis`; 0 means "not derived yet".
    cached_basis: AtomicU64,
}

impl MonotonicClock {
    #[must_use]
    pub const fn new() -> Self {
        Self { cached_basis: AtomicU64::new(0) }
    }

    /// Current basis, deriving and caching it from the platform on first use.
    ///
    /// A degenerate zero denominator reported by the platform is replaced
    /// with the identity basis so conversions can never divide by zero.
    pub fn basis(&self, platform: &dyn HostPlatform) -> ClockBasis {
        let raw = self.cached_basis.load(Ordering::Acquire);
        if raw != 0 {
            return ClockBasis::unpack(raw);
        }

        let mut basis = platform.tick_basis();
        if basis.denom == 0 {
            log::warn!("platform reported zero-denominator clock basis, using 1:1");
            basis = ClockBasis::IDENTITY;
        }
        // Concurrent first calls may race here; they all derive the same
        // constant ratio, so the last store wins harmlessly.
        self.cached_basis.store(basis.pack(), Ordering::Release);
        basis
    }

    /// Convert a raw tick count to nanoseconds.
    ///
    /// Widens to 128 bits before dividing; on platforms with a large
    /// numerator the 64-bit product can overflow.
    pub fn tick_to_nanos(&self, platform: &dyn HostPlatform, tick: u64) -> u64 {
        let basis = self.basis(platform);
        let nanos = u128::from(tick) * u128::from(basis.numer) / u128::from(basis.denom);
        u64::try_from(nanos).unwrap_or(u64::MAX)
    }

    /// Convert a raw tick count to milliseconds.
    #[allow(clippy::cast_precision_loss)] // sub-ns precision loss acceptable in ms output
    pub fn tick_to_millis(&self, platform: &dyn HostPlatform, tick: u64) -> f64 {
        self.tick_to_nanos(platform, tick) as f64 / 1_000_000.0
    }

    /// Drop the cached basis and re-derive it from the platform.
    pub fn reinitialize(&self, platform: &dyn HostPlatform) {
        self.cached_basis.store(0, Ordering::Release);
        self.basis(platform);
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}
