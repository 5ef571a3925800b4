//! Module load ledger
//!
//! Fixed-capacity, append-only array of per-module load records. Slot
//! assignment is lock-free: an atomic fetch-and-increment on the write
//! cursor is the sole authority for slot indices, so two concurrent load
//! events can never claim the same slot. The cursor keeps counting past
//! capacity — events beyond the cap are counted for aggregate totals but
//! their detail records are dropped, which bounds memory by design.
//!
//! Each slot is an individually locked write-once cell. A writer never
//! touches the monitor's aggregate lock while holding a slot, and readers
//! only dereference slots below the published (mutex-guarded) recorded
//! count, so a published count of N guarantees slots `[0, N)` are fully
//! written.

use crate::domain::RelocationOffset;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// Maximum number of detailed module records kept.
pub const DEFAULT_CAPACITY: usize = 512;

/// Module names are truncated to this many characters.
pub const MAX_NAME_CHARS: usize = 255;

/// One module's load detail. Immutable once published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    /// Base filename of the module (no directory), ≤ 255 chars.
    pub name: String,
    /// Monotonic tick at which the load callback fired.
    pub load_tick: u64,
    /// Nanoseconds between monitor startup and this load callback.
    /// 0 when the load was observed before the monitor started timing.
    pub load_duration_nanos: u64,
    /// Classified as a system-provided library.
    pub is_system: bool,
    /// Relocation offset applied by the loader.
    pub relocation_offset: RelocationOffset,
}

/// Fixed-capacity slot array with an atomic write cursor.
pub struct ModuleLedger {
    /// Total load events observed, including dropped and detail-disabled
    /// ones. Sole authority for slot assignment.
    cursor: AtomicU32,
    slots: Box<[Mutex<Option<ModuleRecord>>]>,
    capacity_warned: AtomicBool,
}

impl ModuleLedger {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity).map(|_| Mutex::new(None)).collect();
        Self {
            cursor: AtomicU32::new(0),
            slots,
            capacity_warned: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Total load events observed so far (recorded or not).
    #[must_use]
    pub fn total_events(&self) -> u64 {
        u64::from(self.cursor.load(Ordering::Acquire))
    }

    /// Advance the cursor and claim the next slot.
    ///
    /// Always advances (the cursor is also the total-event count); returns
    /// `None` once capacity is exhausted, in which case the caller drops the
    /// detail record.
    pub fn claim_slot(&self) -> Option<usize> {
        let index = self.cursor.fetch_add(1, Ordering::AcqRel) as usize;
        if index < self.slots.len() {
            Some(index)
        } else {
            if !self.capacity_warned.swap(true, Ordering::Relaxed) {
                log::warn!(
                    "module ledger capacity ({}) exhausted, further records dropped",
                    self.slots.len()
                );
            }
            None
        }
    }

    /// Write the record for a previously claimed slot.
    ///
    /// Must be called with an index obtained from [`Self::claim_slot`]; each
    /// slot is written once.
    pub fn store(&self, slot: usize, record: ModuleRecord) {
        if let Some(cell) = self.slots.get(slot) {
            if let Ok(mut guard) = cell.lock() {
                *guard = Some(record);
            }
        }
    }

    /// Read one slot. `None` for out-of-range or not-yet-written slots.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<ModuleRecord> {
        self.slots.get(slot)?.lock().ok()?.clone()
    }

    /// Copy the first `count` records in load order.
    pub fn collect(&self, count: usize) -> Vec<ModuleRecord> {
        self.slots
            .iter()
            .take(count)
            .filter_map(|cell| cell.lock().ok()?.clone())
            .collect()
    }

    /// Drop all records and restart slot assignment at 0. Test-only; the
    /// caller guarantees no load events are in flight.
    pub fn clear(&self) {
        for cell in &*self.slots {
            if let Ok(mut guard) = cell.lock() {
                *guard = None;
            }
        }
        self.cursor.store(0, Ordering::Release);
        self.capacity_warned.store(false, Ordering::Relaxed);
    }
}

/// Truncate a module name to the ledger's bound, respecting char boundaries.
#[must_use]
pub fn bounded_name(name: &str) -> String {
    if name.chars().count() <= MAX_NAME_CHARS {
        name.to_string()
    } else {
        name.chars().take(MAX_NAME_CHARS).collect()
    }
}
