//! Host platform seam
//!
//! Everything the monitor needs from the operating system goes through the
//! [`HostPlatform`] trait: the monotonic tick counter and its rate
//! descriptor, the process-creation wall-clock instant, the current wall
//! clock, and the reverse lookup from a module handle to its file path.
//!
//! Keeping this a trait object means the core measurement logic never
//! depends on any concrete OS representation, and the whole pipeline can be
//! driven deterministically in tests via [`fake::FakePlatform`].

pub mod fake;
pub mod linux;

use crate::clock::ClockBasis;
use crate::domain::{ModuleHandle, PlatformError};

pub use linux::NativePlatform;

/// OS capabilities consumed by the monitor.
///
/// Implementations must be cheap and non-blocking: `current_tick` sits on
/// the module-load hot path and is called once per loader callback.
pub trait HostPlatform: Send + Sync {
    /// Raw monotonic tick counter value, "now".
    fn current_tick(&self) -> u64;

    /// Tick-rate descriptor converting ticks to nanoseconds.
    ///
    /// Constant for the process lifetime; queried once and cached by
    /// [`crate::clock::MonotonicClock`].
    fn tick_basis(&self) -> ClockBasis;

    /// Wall-clock instant the process was created, in microseconds since
    /// the Unix epoch.
    ///
    /// # Errors
    /// Returns an error when the process table query fails; the monitor
    /// degrades this to "epoch unknown" (0).
    fn process_start_micros(&self) -> Result<u64, PlatformError>;

    /// Current wall clock, in microseconds since the Unix epoch.
    fn wall_clock_micros(&self) -> u64;

    /// Reverse lookup from a module handle to the module's file path.
    ///
    /// `None` when the handle cannot be resolved; the monitor records such
    /// modules under the placeholder name "unknown".
    fn resolve_module_path(&self, handle: ModuleHandle) -> Option<String>;
}

/// Shared platforms forward; lets a test keep a scripting handle to the
/// fake platform it hands the monitor.
impl<P: HostPlatform + ?Sized> HostPlatform for std::sync::Arc<P> {
    fn current_tick(&self) -> u64 {
        (**self).current_tick()
    }

    fn tick_basis(&self) -> ClockBasis {
        (**self).tick_basis()
    }

    fn process_start_micros(&self) -> Result<u64, PlatformError> {
        (**self).process_start_micros()
    }

    fn wall_clock_micros(&self) -> u64 {
        (**self).wall_clock_micros()
    }

    fn resolve_module_path(&self, handle: ModuleHandle) -> Option<String> {
        (**self).resolve_module_path(handle)
    }
}
