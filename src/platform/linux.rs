//! Native Linux backend for the host platform seam.
//!
//! - Monotonic ticks come from `CLOCK_MONOTONIC_RAW`, which is immune to NTP
//!   slewing; one tick is one nanosecond, so the basis is 1:1.
//! - The process-creation instant is reconstructed from `/proc/stat`'s
//!   `btime` (boot time, seconds since the epoch) plus field 22 of
//!   `/proc/self/stat` (`starttime`, clock ticks since boot).
//! - Module handles are treated as addresses and resolved to file paths by
//!   scanning `/proc/self/maps` for the containing mapping.

use crate::clock::ClockBasis;
use crate::domain::{ModuleHandle, PlatformError};
use crate::platform::HostPlatform;
use anyhow::{bail, Context, Result};
use nix::time::{clock_gettime, ClockId};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// `HostPlatform` backed by /proc and the raw monotonic clock.
#[derive(Debug, Default)]
pub struct NativePlatform;

impl NativePlatform {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HostPlatform for NativePlatform {
    #[allow(clippy::cast_sign_loss)] // CLOCK_MONOTONIC_RAW never goes negative
    fn current_tick(&self) -> u64 {
        match clock_gettime(ClockId::CLOCK_MONOTONIC_RAW) {
            Ok(ts) => ts.tv_sec() as u64 * 1_000_000_000 + ts.tv_nsec() as u64,
            Err(_) => 0,
        }
    }

    fn tick_basis(&self) -> ClockBasis {
        // One raw tick is one nanosecond on Linux.
        ClockBasis::IDENTITY
    }

    fn process_start_micros(&self) -> Result<u64, PlatformError> {
        process_start_micros_from_proc()
            .map_err(|e| PlatformError::ProcessStartUnavailable(format!("{e:#}")))
    }

    fn wall_clock_micros(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }

    fn resolve_module_path(&self, handle: ModuleHandle) -> Option<String> {
        let maps = fs::read_to_string("/proc/self/maps").ok()?;
        find_mapping_path(&maps, handle.0)
    }
}

/// Reconstruct the process-creation wall-clock instant in microseconds.
fn process_start_micros_from_proc() -> Result<u64> {
    let stat = fs::read_to_string("/proc/stat").context("Failed to read /proc/stat")?;
    let btime_secs = parse_btime_secs(&stat)?;

    let self_stat =
        fs::read_to_string("/proc/self/stat").context("Failed to read /proc/self/stat")?;
    let start_ticks = parse_start_ticks(&self_stat)?;

    let hz = clock_ticks_per_second()?;
    let start_micros = u128::from(btime_secs) * 1_000_000
        + u128::from(start_ticks) * 1_000_000 / u128::from(hz);
    Ok(u64::try_from(start_micros).unwrap_or(u64::MAX))
}

/// Extract the `btime` line (boot time, seconds since epoch) from /proc/stat.
fn parse_btime_secs(stat_contents: &str) -> Result<u64> {
    for line in stat_contents.lines() {
        if let Some(rest) = line.strip_prefix("btime ") {
            return rest.trim().parse::<u64>().context("Failed to parse btime value");
        }
    }
    bail!("No btime line in /proc/stat")
}

/// Extract field 22 (`starttime`, clock ticks since boot) from /proc/pid/stat.
///
/// Format: "pid (comm) state ppid ...". The comm can itself contain spaces
/// and parentheses, so fields are counted from the *last* closing paren.
fn parse_start_ticks(stat_line: &str) -> Result<u64> {
    let close = stat_line.rfind(')').context("Invalid stat format")?;
    let fields: Vec<&str> = stat_line[close + 1..].split_whitespace().collect();
    // Fields after the comm start at field 3 (state); starttime is field 22.
    let raw = fields.get(19).context("stat line too short for starttime")?;
    raw.parse::<u64>().context("Failed to parse starttime")
}

#[allow(unsafe_code)] // sysconf() requires unsafe
#[allow(clippy::cast_sign_loss)] // hz is checked positive before the cast
fn clock_ticks_per_second() -> Result<u64> {
    let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if hz <= 0 {
        bail!("sysconf(_SC_CLK_TCK) returned {hz}");
    }
    Ok(hz as u64)
}

/// Find the pathname of the /proc/self/maps entry containing `addr`.
///
/// Maps line format: "start-end perms offset dev inode pathname". Anonymous
/// mappings have no pathname column and are skipped.
fn find_mapping_path(maps: &str, addr: u64) -> Option<String> {
    for line in maps.lines() {
        let mut parts = line.split_whitespace();
        let Some(range) = parts.next() else {
            continue;
        };
        let Some((start, end)) = range.split_once('-') else {
            continue;
        };
        let Ok(start) = u64::from_str_radix(start, 16) else {
            continue;
        };
        let Ok(end) = u64::from_str_radix(end, 16) else {
            continue;
        };
        if addr < start || addr >= end {
            continue;
        }
        // Skip perms, offset, dev, inode; the remainder is the pathname.
        let path: Vec<&str> = parts.skip(4).collect();
        if path.is_empty() {
            return None;
        }
        return Some(path.join(" "));
    }
    None
}
