//! # launch-scope — pre-entry launch phase monitor
//!
//! launch-scope measures, with sub-millisecond precision, how a process
//! spends time between kernel process creation and the point its own entry
//! point begins executing, and decomposes that interval into phases:
//! static-initializer execution, module (shared library) loading, an
//! optional language-runtime load phase, and the tail between the last
//! module load and entry.
//!
//! ## Architecture Overview
//!
//! ```text
//!  kernel creates process                     application entry
//!        │                                           │
//!        ▼                                           ▼
//!  ──────┬──────────┬───────────────────────┬────────┬─────────▶ time
//!        │ estimated │ static │   module    │  tail  │
//!        │ (wall Δ)  │ inits  │   loading   │        │
//!        ▲           ▲        ▲             ▲        ▲
//!   process epoch  ctor   first load     last load  entry
//!   (/proc query)  tick     tick           tick     tick
//! ```
//!
//! Loader "image added" callbacks feed the [`ledger`] (a fixed-capacity,
//! atomically indexed slot array) and the phase timestamps; marking entry
//! triggers the [`durations`] calculator once; afterwards the snapshot and
//! record queries serve read-only consumers.
//!
//! ## Module Structure
//!
//! - [`monitor`]: the aggregate — timestamps, counters, flags, queries
//! - [`ledger`]: per-module load records, atomic write cursor
//! - [`clock`]: raw monotonic ticks → nanoseconds/milliseconds
//! - [`durations`]: the six derived phase durations
//! - [`timestamps`]: one-shot timestamp cells
//! - [`classification`]: system-vs-user module path classification
//! - [`platform`]: the OS seam (native /proc backend, deterministic fake)
//! - [`domain`]: newtypes and error types
//!
//! ## Host integration
//!
//! Two calls are required, everything else is optional:
//!
//! 1. Arrange for [`initialize`] to run before any other code that might
//!    load modules (an early constructor, or the first line of your
//!    bootstrap), and wire your loader's "image added" hook to
//!    [`on_module_loaded`]. The hook facility itself is host-provided; the
//!    monitor treats it as a black-box event source.
//! 2. Call [`mark_entry_reached`] at the earliest point of your entry
//!    sequence. This freezes the measurement and computes the durations.
//!
//! ```no_run
//! use launch_scope::{initialize, mark_entry_reached, monitor};
//!
//! initialize(); // normally done from an early startup hook
//! // ... loader callbacks arrive via launch_scope::on_module_loaded ...
//! mark_entry_reached();
//!
//! let snapshot = monitor().snapshot();
//! println!("pre-entry: {:.3} ms", snapshot.durations.total_pre_entry_ms);
//! for record in monitor().slowest_modules(5) {
//!     println!("  {} {} ns", record.name, record.load_duration_nanos);
//! }
//! ```
//!
//! ## What is exact and what is estimated
//!
//! Everything measured between the constructor tick and the entry tick uses
//! one monotonic clock and is exact. The kernel→constructor figure is the
//! one exception: it mixes a wall-clock delta with a monotonic delta, is
//! clamped at zero, and must be read as an estimate only.

pub mod classification;
pub mod clock;
pub mod domain;
pub mod durations;
pub mod ledger;
pub mod monitor;
pub mod platform;
pub mod timestamps;

pub use clock::{ClockBasis, MonotonicClock};
pub use domain::{ModuleHandle, RelocationOffset};
pub use durations::PhaseDurations;
pub use ledger::{ModuleLedger, ModuleRecord, DEFAULT_CAPACITY};
pub use monitor::{MonitorSnapshot, PreMainMonitor};
pub use platform::{HostPlatform, NativePlatform};
pub use timestamps::PhaseTimestamps;

use std::sync::OnceLock;

/// Process-wide monitor instance, created on first access.
static MONITOR: OnceLock<PreMainMonitor> = OnceLock::new();

/// Get the process-wide monitor, backed by the native platform.
pub fn monitor() -> &'static PreMainMonitor {
    MONITOR.get_or_init(|| PreMainMonitor::new(Box::new(NativePlatform::new())))
}

/// Start timing. Must run before any other code that might load modules;
/// idempotent, only the first call does anything.
pub fn initialize() {
    monitor().initialize();
}

/// Loader callback entry point: a module was added to the process image.
pub fn on_module_loaded(handle: ModuleHandle, relocation_offset: RelocationOffset) {
    monitor().on_module_loaded(handle, relocation_offset);
}

/// Mark that the application's entry point has been reached; computes the
/// phase durations. First call wins.
pub fn mark_entry_reached() {
    monitor().mark_entry_reached();
}

/// Optional marker: language-runtime load phase begins.
pub fn mark_runtime_load_start() {
    monitor().mark_runtime_load_start();
}

/// Optional marker: language-runtime load phase ended.
pub fn mark_runtime_load_end() {
    monitor().mark_runtime_load_end();
}

/// Toggle per-module detail recording for subsequent load events.
pub fn set_detail_recording_enabled(enabled: bool) {
    monitor().set_detail_recording_enabled(enabled);
}
