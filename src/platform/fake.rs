//! Deterministic in-memory host platform.
//!
//! Drives the whole measurement pipeline from manually supplied readings:
//! the tick counter, wall clock, clock basis, process epoch, and the
//! handle→path table are all under test control. Used by the crate's own
//! test suite and useful to embedders validating their integration.

use crate::clock::ClockBasis;
use crate::domain::{ModuleHandle, PlatformError};
use crate::platform::HostPlatform;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// `HostPlatform` with scripted readings.
#[derive(Debug)]
pub struct FakePlatform {
    tick: AtomicU64,
    wall_micros: AtomicU64,
    basis: ClockBasis,
    /// `None` simulates a failed process-table query.
    start_micros: Option<u64>,
    paths: Mutex<HashMap<u64, String>>,
}

impl FakePlatform {
    /// Platform at tick 0 with a 1:1 basis and a known epoch of 0 (unknown).
    #[must_use]
    pub fn new() -> Self {
        Self {
            tick: AtomicU64::new(0),
            wall_micros: AtomicU64::new(0),
            basis: ClockBasis::IDENTITY,
            start_micros: None,
            paths: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_basis(mut self, basis: ClockBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Make the process-table query succeed with the given epoch.
    #[must_use]
    pub fn with_start_micros(mut self, micros: u64) -> Self {
        self.start_micros = Some(micros);
        self
    }

    pub fn set_tick(&self, tick: u64) {
        self.tick.store(tick, Ordering::SeqCst);
    }

    pub fn advance_tick(&self, delta: u64) {
        self.tick.fetch_add(delta, Ordering::SeqCst);
    }

    pub fn set_wall_micros(&self, micros: u64) {
        self.wall_micros.store(micros, Ordering::SeqCst);
    }

    /// Register a handle→path mapping for `resolve_module_path`.
    pub fn map_module(&self, handle: ModuleHandle, path: &str) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.insert(handle.0, path.to_string());
        }
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HostPlatform for FakePlatform {
    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    fn tick_basis(&self) -> ClockBasis {
        self.basis
    }

    fn process_start_micros(&self) -> Result<u64, PlatformError> {
        self.start_micros
            .ok_or_else(|| PlatformError::ProcessStartUnavailable("scripted failure".to_string()))
    }

    fn wall_clock_micros(&self) -> u64 {
        self.wall_micros.load(Ordering::SeqCst)
    }

    fn resolve_module_path(&self, handle: ModuleHandle) -> Option<String> {
        self.paths.lock().ok()?.get(&handle.0).cloned()
    }
}
