//! Phase timestamps for the boot sequence.
//!
//! Every key instant is captured at most once: the cells transition
//! unset→set exactly once and silently ignore later writes (first call
//! wins). The single exception is the last-load tick, which always advances
//! to the newest value. All fields live under the monitor's aggregate lock;
//! the one-shot guard here is the read-check-write the lock makes atomic.

use serde::Serialize;

/// One-way unset→set tick cell. 0 means unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OneShotTick(u64);

impl OneShotTick {
    /// Set the cell if it is still unset. Returns whether this call won.
    ///
    /// A zero tick cannot mark the cell set; 0 is the unset sentinel.
    pub fn set(&mut self, tick: u64) -> bool {
        if self.0 == 0 && tick != 0 {
            self.0 = tick;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

/// The recorded instants of the pre-entry sequence. 0 = not observed.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PhaseTimestamps {
    /// Process-creation wall-clock instant (microseconds since epoch).
    /// Unlike the tick fields this is wall time, queried once at init.
    pub process_epoch_micros: u64,
    /// Monitor startup — the zero point of the measured interval.
    pub constructor_tick: OneShotTick,
    /// First module-load callback.
    pub first_load_tick: OneShotTick,
    /// Most recent module-load callback; advances on every event.
    pub last_load_tick: u64,
    /// Application entry marker.
    pub entry_tick: OneShotTick,
    /// Optional language-runtime load phase markers.
    pub runtime_load_start_tick: OneShotTick,
    pub runtime_load_end_tick: OneShotTick,
}

impl PhaseTimestamps {
    /// Record a module-load callback instant: first one sticks, last one
    /// always advances.
    pub fn record_load(&mut self, tick: u64) {
        self.first_load_tick.set(tick);
        self.last_load_tick = tick;
    }
}
