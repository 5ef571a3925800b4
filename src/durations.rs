//! Derived phase durations.
//!
//! Computed once, when the application-entry marker is set, from a locked
//! snapshot of the phase timestamps. A duration whose inputs are missing
//! (still 0) is left at its 0.0 default rather than producing a partial or
//! garbage value — absence is never an error here.
//!
//! Decomposition identity: with all inputs present,
//! `total_pre_entry_ms == static_initializer_ms + module_loading_ms +
//! post_load_to_entry_ms`, since the three sub-phases tile the
//! constructor→entry interval exactly.

use crate::clock::MonotonicClock;
use crate::platform::HostPlatform;
use crate::timestamps::PhaseTimestamps;
use serde::Serialize;

/// Phase durations in milliseconds. 0.0 = could not be computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PhaseDurations {
    /// Monitor startup to application entry — the authoritative, exactly
    /// measured top-line figure.
    pub total_pre_entry_ms: f64,
    /// First to last module-load callback.
    pub module_loading_ms: f64,
    /// Language-runtime load phase, when its markers were supplied.
    pub runtime_load_ms: f64,
    /// Monitor startup to first module-load callback.
    pub static_initializer_ms: f64,
    /// Last module-load callback to application entry.
    pub post_load_to_entry_ms: f64,
    /// Kernel process creation to monitor startup. An *estimate*: it mixes
    /// a wall-clock delta with a monotonic one and is clamped to zero, since
    /// clock adjustment can otherwise make it negative. Zero when the
    /// process epoch is unknown.
    pub estimated_kernel_to_constructor_ms: f64,
}

/// Compute all durations from a snapshot of the timestamps.
///
/// Idempotent for identical timestamps, except the kernel estimate, which
/// necessarily reads the current wall clock.
pub fn calculate(
    ts: &PhaseTimestamps,
    clock: &MonotonicClock,
    platform: &dyn HostPlatform,
) -> PhaseDurations {
    let mut dur = PhaseDurations::default();

    let constructor = ts.constructor_tick.get();
    let first_load = ts.first_load_tick.get();
    let last_load = ts.last_load_tick;
    let entry = ts.entry_tick.get();

    if entry == 0 {
        // Entry not marked; nothing downstream is computable.
        return dur;
    }

    if constructor > 0 {
        dur.total_pre_entry_ms = clock.tick_to_millis(platform, entry.saturating_sub(constructor));
    }
    if first_load > 0 && last_load > 0 {
        dur.module_loading_ms = clock.tick_to_millis(platform, last_load.saturating_sub(first_load));
    }
    if ts.runtime_load_start_tick.is_set() && ts.runtime_load_end_tick.is_set() {
        let span = ts.runtime_load_end_tick.get().saturating_sub(ts.runtime_load_start_tick.get());
        dur.runtime_load_ms = clock.tick_to_millis(platform, span);
    }
    if constructor > 0 && first_load > 0 {
        dur.static_initializer_ms =
            clock.tick_to_millis(platform, first_load.saturating_sub(constructor));
    }
    if last_load > 0 {
        dur.post_load_to_entry_ms = clock.tick_to_millis(platform, entry.saturating_sub(last_load));
    }

    if ts.process_epoch_micros > 0 && constructor > 0 {
        dur.estimated_kernel_to_constructor_ms = estimate_kernel_to_constructor(
            ts.process_epoch_micros,
            constructor,
            clock,
            platform,
        );
    }

    dur
}

/// Wall-clock-since-start minus monotonic-since-constructor, clamped at 0.
#[allow(clippy::cast_precision_loss)] // microsecond deltas fit f64 comfortably
fn estimate_kernel_to_constructor(
    epoch_micros: u64,
    constructor_tick: u64,
    clock: &MonotonicClock,
    platform: &dyn HostPlatform,
) -> f64 {
    let now_micros = platform.wall_clock_micros();
    let since_start_ms = now_micros.saturating_sub(epoch_micros) as f64 / 1_000.0;

    let now_tick = platform.current_tick();
    let constructor_to_now_ms =
        clock.tick_to_millis(platform, now_tick.saturating_sub(constructor_tick));

    (since_start_ms - constructor_to_now_ms).max(0.0)
}
