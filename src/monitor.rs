//! Pre-entry monitor aggregate.
//!
//! Owns the platform backend, the clock, the module ledger, and the
//! mutex-guarded aggregate state (timestamps, durations, counters, flags).
//! Designed to be constructed once at process start in a static slot and
//! then fed by the host's loader callback; see the crate root for the
//! process-wide singleton and integration contract.
//!
//! Locking discipline: one aggregate mutex guards timestamps, durations and
//! the derived counters. Ledger slot assignment is lock-free (atomic
//! cursor); a slot's record is written before the recorded-count is bumped
//! under the aggregate lock, so readers that bound slot access by the
//! published count never observe a half-written record.

use crate::classification::{is_system_module, module_basename};
use crate::clock::{ClockBasis, MonotonicClock};
use crate::domain::{ModuleHandle, RelocationOffset};
use crate::durations::{self, PhaseDurations};
use crate::ledger::{bounded_name, ModuleLedger, ModuleRecord, DEFAULT_CAPACITY};
use crate::platform::HostPlatform;
use crate::timestamps::PhaseTimestamps;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Placeholder name for modules whose path could not be resolved.
const UNKNOWN_MODULE_NAME: &str = "unknown";

/// Aggregate fields guarded by the monitor's mutex.
#[derive(Debug, Default)]
struct MonitorState {
    timestamps: PhaseTimestamps,
    durations: PhaseDurations,
    /// Modules with a fully written ledger record; publication bound for
    /// slot readers.
    recorded_modules: u32,
    system_modules: u32,
    user_modules: u32,
    entry_marked: bool,
}

/// Read-only copy of the monitor's aggregate state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MonitorSnapshot {
    pub clock_basis: ClockBasis,
    pub timestamps: PhaseTimestamps,
    pub durations: PhaseDurations,
    /// Total module-load events observed, including events beyond the
    /// ledger capacity and events delivered while detail recording was off.
    pub module_count: u64,
    /// Events with a detail record in the ledger.
    pub recorded_module_count: u32,
    pub system_module_count: u32,
    pub user_module_count: u32,
    pub entry_marked: bool,
    pub detail_recording_enabled: bool,
}

/// Pre-entry phase monitor.
pub struct PreMainMonitor {
    platform: Box<dyn HostPlatform>,
    clock: MonotonicClock,
    ledger: ModuleLedger,
    state: Mutex<MonitorState>,
    detail_enabled: AtomicBool,
    initialized: AtomicBool,
}

impl PreMainMonitor {
    /// Monitor with the default ledger capacity (512 records).
    #[must_use]
    pub fn new(platform: Box<dyn HostPlatform>) -> Self {
        Self::with_capacity(platform, DEFAULT_CAPACITY)
    }

    /// Monitor with an explicit ledger capacity.
    #[must_use]
    pub fn with_capacity(platform: Box<dyn HostPlatform>, capacity: usize) -> Self {
        Self {
            platform,
            clock: MonotonicClock::new(),
            ledger: ModuleLedger::new(capacity),
            state: Mutex::new(MonitorState::default()),
            detail_enabled: AtomicBool::new(true),
            initialized: AtomicBool::new(false),
        }
    }

    /// Start timing: derive the clock basis, record the constructor tick
    /// (the zero point of the measured interval) and query the process
    /// epoch. Idempotent; only the first call does anything.
    ///
    /// Host-integration contract: this must run before any other component
    /// of the host process that might load modules, and before the loader
    /// callback is registered.
    pub fn initialize(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }

        self.clock.reinitialize(self.platform.as_ref());
        let tick = self.platform.current_tick();
        let epoch = match self.platform.process_start_micros() {
            Ok(micros) => micros,
            Err(e) => {
                // Degrade to "unknown"; the kernel estimate stays 0.
                log::warn!("{e}");
                0
            }
        };

        if let Ok(mut state) = self.state.lock() {
            state.timestamps.constructor_tick.set(tick);
            state.timestamps.process_epoch_micros = epoch;
        }
        log::debug!("launch monitor initialized at tick {tick}, epoch {epoch}us");
    }

    /// Loader callback: one module (past or future) was added to the
    /// process image. Safe to call concurrently with itself and with reads.
    pub fn on_module_loaded(&self, handle: ModuleHandle, relocation_offset: RelocationOffset) {
        let tick = self.platform.current_tick();

        // First/last callback instants are tracked even when detail
        // recording is off; the constructor tick is read in the same
        // critical section for the per-module duration below.
        let constructor_tick = match self.state.lock() {
            Ok(mut state) => {
                state.timestamps.record_load(tick);
                state.timestamps.constructor_tick.get()
            }
            Err(_) => return,
        };

        // The cursor advances unconditionally so aggregate totals stay
        // correct; only the detail record is subject to the toggle and the
        // capacity bound.
        let slot = self.ledger.claim_slot();
        if !self.detail_enabled.load(Ordering::Relaxed) {
            return;
        }
        let Some(slot) = slot else {
            return;
        };

        let path = self.platform.resolve_module_path(handle);
        let (name, is_system) = match path.as_deref() {
            Some(p) => (bounded_name(module_basename(p)), is_system_module(p)),
            None => (UNKNOWN_MODULE_NAME.to_string(), false),
        };

        // A module cannot have loaded before the monitor started timing;
        // undefined ordering yields 0, never a wrapped value.
        let load_duration_nanos = if constructor_tick > 0 {
            self.clock
                .tick_to_nanos(self.platform.as_ref(), tick.saturating_sub(constructor_tick))
        } else {
            0
        };

        let record = ModuleRecord {
            name,
            load_tick: tick,
            load_duration_nanos,
            is_system,
            relocation_offset,
        };

        // Write the slot first, then publish via the counters: a reader
        // observing recorded_modules == N finds slots [0, N) fully written.
        self.ledger.store(slot, record);
        if let Ok(mut state) = self.state.lock() {
            state.recorded_modules += 1;
            if is_system {
                state.system_modules += 1;
            } else {
                state.user_modules += 1;
            }
        }
    }

    /// Mark that the application's own entry point has been reached and
    /// compute the phase durations. First call wins; later calls are no-ops.
    pub fn mark_entry_reached(&self) {
        let tick = self.platform.current_tick();
        if let Ok(mut state) = self.state.lock() {
            if state.entry_marked {
                return;
            }
            state.timestamps.entry_tick.set(tick);
            state.entry_marked = true;
            state.durations =
                durations::calculate(&state.timestamps, &self.clock, self.platform.as_ref());
        }
    }

    /// Optional marker: language-runtime load phase begins. Set once.
    pub fn mark_runtime_load_start(&self) {
        let tick = self.platform.current_tick();
        if let Ok(mut state) = self.state.lock() {
            state.timestamps.runtime_load_start_tick.set(tick);
        }
    }

    /// Optional marker: language-runtime load phase ended. Set once.
    pub fn mark_runtime_load_end(&self) {
        let tick = self.platform.current_tick();
        if let Ok(mut state) = self.state.lock() {
            state.timestamps.runtime_load_end_tick.set(tick);
        }
    }

    /// Toggle per-module detail recording; affects subsequent load events
    /// only. Aggregate counts and phase timestamps are always collected.
    pub fn set_detail_recording_enabled(&self, enabled: bool) {
        self.detail_enabled.store(enabled, Ordering::Relaxed);
    }

    #[must_use]
    pub fn detail_recording_enabled(&self) -> bool {
        self.detail_enabled.load(Ordering::Relaxed)
    }

    /// Read-only copy of the aggregate state.
    #[must_use]
    pub fn snapshot(&self) -> MonitorSnapshot {
        let (timestamps, durations, recorded, system, user, entry_marked) =
            match self.state.lock() {
                Ok(state) => (
                    state.timestamps,
                    state.durations,
                    state.recorded_modules,
                    state.system_modules,
                    state.user_modules,
                    state.entry_marked,
                ),
                Err(_) => Default::default(),
            };
        MonitorSnapshot {
            clock_basis: self.clock.basis(self.platform.as_ref()),
            timestamps,
            durations,
            module_count: self.ledger.total_events(),
            recorded_module_count: recorded,
            system_module_count: system,
            user_module_count: user,
            entry_marked,
            detail_recording_enabled: self.detail_recording_enabled(),
        }
    }

    /// One module record by load-order slot index. `None` past the claimed
    /// range, and for slots with no detail record (events observed while
    /// detail recording was off leave their slot empty).
    #[must_use]
    pub fn module_record(&self, index: usize) -> Option<ModuleRecord> {
        self.ledger.get(index)
    }

    /// Up to `max` records in load order, as one consistent snapshot.
    ///
    /// Slots claimed by detail-disabled events stay empty and are skipped.
    #[must_use]
    pub fn modules(&self, max: usize) -> Vec<ModuleRecord> {
        // Hold the aggregate lock across the copy so the published counters
        // and the slot contents agree.
        let Ok(_state) = self.state.lock() else {
            return Vec::new();
        };
        let claimed =
            usize::try_from(self.ledger.total_events()).unwrap_or(usize::MAX);
        let mut records = self.ledger.collect(claimed.min(self.ledger.capacity()));
        records.truncate(max);
        records
    }

    /// The `n` slowest-loading modules, by descending load duration.
    ///
    /// The sort is unstable and equal durations have no defined order. The
    /// snapshot is copied under the lock; the O(n log n) sort runs outside
    /// it.
    #[must_use]
    pub fn slowest_modules(&self, n: usize) -> Vec<ModuleRecord> {
        let mut records = self.modules(self.ledger.capacity());
        records.sort_unstable_by(|a, b| b.load_duration_nanos.cmp(&a.load_duration_nanos));
        records.truncate(n);
        records
    }

    /// Convert a raw tick count to nanoseconds using this monitor's clock.
    #[must_use]
    pub fn tick_to_nanos(&self, tick: u64) -> u64 {
        self.clock.tick_to_nanos(self.platform.as_ref(), tick)
    }

    /// Convert a raw tick count to milliseconds using this monitor's clock.
    #[must_use]
    pub fn tick_to_millis(&self, tick: u64) -> f64 {
        self.clock.tick_to_millis(self.platform.as_ref(), tick)
    }

    /// Raw monotonic tick value, "now".
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.platform.current_tick()
    }

    /// Test-only: return everything to the initial state, re-derive the
    /// clock basis and re-enable detail recording. The caller guarantees no
    /// load events are in flight; there is no internal guard for that.
    pub fn reset(&self) {
        if let Ok(mut state) = self.state.lock() {
            *state = MonitorState::default();
        }
        self.ledger.clear();
        self.detail_enabled.store(true, Ordering::Relaxed);
        // Allow a fresh initialize(), as if in a new process.
        self.initialized.store(false, Ordering::Release);
        self.clock.reinitialize(self.platform.as_ref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakePlatform;
    use std::sync::Arc;

    fn monitor_with(platform: FakePlatform, capacity: usize) -> (PreMainMonitor, Arc<FakePlatform>) {
        let platform = Arc::new(platform);
        let shared = Arc::clone(&platform);
        (PreMainMonitor::with_capacity(Box::new(platform), capacity), shared)
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        platform.set_tick(2000);
        monitor.initialize();
        assert_eq!(monitor.snapshot().timestamps.constructor_tick.get(), 1000);
    }

    #[test]
    fn test_load_events_update_first_and_last() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        platform.set_tick(1200);
        monitor.on_module_loaded(ModuleHandle(0x1), 0);
        platform.set_tick(5000);
        monitor.on_module_loaded(ModuleHandle(0x2), 0);

        let snap = monitor.snapshot();
        assert_eq!(snap.timestamps.first_load_tick.get(), 1200);
        assert_eq!(snap.timestamps.last_load_tick, 5000);
        assert_eq!(snap.module_count, 2);
    }

    #[test]
    fn test_unresolvable_module_gets_placeholder() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        monitor.on_module_loaded(ModuleHandle(0xdead), -4096);

        let record = monitor.module_record(0).expect("record");
        assert_eq!(record.name, "unknown");
        assert!(!record.is_system);
        assert_eq!(record.relocation_offset, -4096);
    }

    #[test]
    fn test_classification_counters() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.map_module(ModuleHandle(0x1), "/usr/lib/libc.so.6");
        platform.map_module(ModuleHandle(0x2), "/opt/app/libplugin.so");
        platform.set_tick(1000);
        monitor.initialize();
        monitor.on_module_loaded(ModuleHandle(0x1), 0);
        monitor.on_module_loaded(ModuleHandle(0x2), 0);

        let snap = monitor.snapshot();
        assert_eq!(snap.system_module_count, 1);
        assert_eq!(snap.user_module_count, 1);
        assert_eq!(snap.system_module_count + snap.user_module_count, snap.recorded_module_count);

        let first = monitor.module_record(0).expect("record");
        assert_eq!(first.name, "libc.so.6");
        assert!(first.is_system);
    }

    #[test]
    fn test_load_duration_relative_to_constructor() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        platform.set_tick(4000);
        monitor.on_module_loaded(ModuleHandle(0x1), 0);
        assert_eq!(monitor.module_record(0).expect("record").load_duration_nanos, 3000);
    }

    #[test]
    fn test_load_before_initialize_has_zero_duration() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(4000);
        monitor.on_module_loaded(ModuleHandle(0x1), 0);
        assert_eq!(monitor.module_record(0).expect("record").load_duration_nanos, 0);
    }

    #[test]
    fn test_detail_disabled_still_counts() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        monitor.set_detail_recording_enabled(false);
        monitor.on_module_loaded(ModuleHandle(0x1), 0);
        monitor.on_module_loaded(ModuleHandle(0x2), 0);

        let snap = monitor.snapshot();
        assert_eq!(snap.module_count, 2);
        assert_eq!(snap.recorded_module_count, 0);
        assert!(monitor.modules(16).is_empty());
        // First/last ticks still track every event.
        assert!(snap.timestamps.first_load_tick.is_set());
    }

    #[test]
    fn test_capacity_overflow_counts_but_drops_detail() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 2);
        platform.set_tick(1000);
        monitor.initialize();
        for handle in 1..=3u64 {
            monitor.on_module_loaded(ModuleHandle(handle), 0);
        }

        let snap = monitor.snapshot();
        assert_eq!(snap.module_count, 3);
        assert_eq!(monitor.modules(16).len(), 2);
        assert!(monitor.module_record(2).is_none());
    }

    #[test]
    fn test_mark_entry_computes_durations_once() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        platform.set_tick(1200);
        monitor.on_module_loaded(ModuleHandle(0x1), 0);
        platform.set_tick(5000);
        monitor.on_module_loaded(ModuleHandle(0x2), 0);
        platform.set_tick(6000);
        monitor.mark_entry_reached();

        let first = monitor.snapshot();
        assert!(first.entry_marked);
        assert!((first.durations.total_pre_entry_ms - 0.005).abs() < 1e-9);

        // A second mark at a later tick is a no-op.
        platform.set_tick(9_000_000);
        monitor.mark_entry_reached();
        let second = monitor.snapshot();
        assert_eq!(second.timestamps.entry_tick.get(), 6000);
        assert_eq!(second.durations, first.durations);
    }

    #[test]
    fn test_runtime_load_markers_are_one_shot() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        platform.set_tick(2000);
        monitor.mark_runtime_load_start();
        platform.set_tick(2500);
        monitor.mark_runtime_load_start();
        platform.set_tick(3000);
        monitor.mark_runtime_load_end();

        let ts = monitor.snapshot().timestamps;
        assert_eq!(ts.runtime_load_start_tick.get(), 2000);
        assert_eq!(ts.runtime_load_end_tick.get(), 3000);
    }

    #[test]
    fn test_slowest_modules_sorted_descending() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        for (handle, tick) in [(1u64, 1500), (2, 9000), (3, 4000)] {
            platform.set_tick(tick);
            monitor.on_module_loaded(ModuleHandle(handle), 0);
        }

        let slowest = monitor.slowest_modules(2);
        assert_eq!(slowest.len(), 2);
        assert!(slowest[0].load_duration_nanos >= slowest[1].load_duration_nanos);
        assert_eq!(slowest[0].load_tick, 9000);
        assert_eq!(slowest[1].load_tick, 4000);
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let (monitor, platform) = monitor_with(FakePlatform::new().with_start_micros(500), 8);
        platform.set_tick(1000);
        monitor.initialize();
        monitor.on_module_loaded(ModuleHandle(0x1), 0);
        platform.set_tick(2000);
        monitor.mark_entry_reached();

        monitor.reset();
        let snap = monitor.snapshot();
        assert_eq!(snap.module_count, 0);
        assert_eq!(snap.recorded_module_count, 0);
        assert!(!snap.entry_marked);
        assert!(snap.detail_recording_enabled);
        assert_eq!(snap.timestamps.constructor_tick.get(), 0);
        assert!(monitor.modules(16).is_empty());

        // A subsequent run behaves as if from a fresh process.
        platform.set_tick(3000);
        monitor.initialize();
        monitor.on_module_loaded(ModuleHandle(0x2), 0);
        assert_eq!(monitor.snapshot().module_count, 1);
        assert!(monitor.module_record(0).is_some());
    }

    #[test]
    fn test_snapshot_serializes() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 8);
        platform.set_tick(1000);
        monitor.initialize();
        monitor.mark_entry_reached();
        let json = serde_json::to_string(&monitor.snapshot()).expect("serialize snapshot");
        assert!(json.contains("total_pre_entry_ms"));
        assert!(json.contains("module_count"));
    }

    #[test]
    fn test_concurrent_loads_publish_consistently() {
        let (monitor, platform) = monitor_with(FakePlatform::new(), 64);
        platform.set_tick(1000);
        monitor.initialize();
        platform.set_tick(2000);

        let monitor = Arc::new(monitor);
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let monitor = Arc::clone(&monitor);
            handles.push(std::thread::spawn(move || {
                for i in 0..16u64 {
                    monitor.on_module_loaded(ModuleHandle(t * 100 + i), 0);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("load thread");
        }

        let snap = monitor.snapshot();
        assert_eq!(snap.module_count, 64);
        assert_eq!(snap.recorded_module_count, 64);
        let records = monitor.modules(64);
        assert_eq!(records.len(), 64);
        // Every published slot is fully written.
        assert!(records.iter().all(|r| r.load_tick == 2000));
    }
}
