//! Process-wide singleton surface, exercised against the native platform.
//!
//! These tests share the global monitor and mutate it, so they run
//! serialized and each starts from a reset.

use launch_scope::{monitor, ModuleHandle};
use serial_test::serial;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
#[serial]
fn test_global_end_to_end_on_native_platform() {
    init_logging();
    monitor().reset();

    launch_scope::initialize();
    launch_scope::initialize(); // idempotent

    // Feed the callback an address inside our own image; resolution depends
    // on the environment, so only the counting behavior is asserted.
    static MARKER: u8 = 0;
    let addr = std::ptr::addr_of!(MARKER) as u64;
    launch_scope::on_module_loaded(ModuleHandle(addr), 0);
    launch_scope::on_module_loaded(ModuleHandle(0x1), 0);

    launch_scope::mark_entry_reached();

    let snap = monitor().snapshot();
    assert!(snap.entry_marked);
    assert_eq!(snap.module_count, 2);
    assert_eq!(snap.recorded_module_count, 2);
    assert!(snap.timestamps.constructor_tick.is_set());
    // Native epoch query works on Linux, so the estimate is computable and
    // clamped to be non-negative.
    assert!(snap.timestamps.process_epoch_micros > 0);
    assert!(snap.durations.estimated_kernel_to_constructor_ms >= 0.0);
    assert!(snap.durations.total_pre_entry_ms >= 0.0);

    // The unresolvable handle degraded to the placeholder record.
    let names: Vec<String> =
        monitor().modules(8).into_iter().map(|r| r.name).collect();
    assert_eq!(names.len(), 2);
    assert_eq!(names[1], "unknown");

    monitor().reset();
}

#[test]
#[serial]
fn test_global_detail_toggle() {
    init_logging();
    monitor().reset();

    launch_scope::initialize();
    launch_scope::set_detail_recording_enabled(false);
    launch_scope::on_module_loaded(ModuleHandle(0x1), 0);
    assert_eq!(monitor().snapshot().module_count, 1);
    assert!(monitor().modules(8).is_empty());

    launch_scope::set_detail_recording_enabled(true);
    launch_scope::on_module_loaded(ModuleHandle(0x2), 0);
    assert_eq!(monitor().snapshot().module_count, 2);
    assert_eq!(monitor().modules(8).len(), 1);

    monitor().reset();
}

#[test]
#[serial]
fn test_global_runtime_markers() {
    init_logging();
    monitor().reset();

    launch_scope::initialize();
    launch_scope::mark_runtime_load_start();
    launch_scope::mark_runtime_load_end();
    launch_scope::mark_entry_reached();

    let ts = monitor().snapshot().timestamps;
    assert!(ts.runtime_load_start_tick.is_set());
    assert!(ts.runtime_load_end_tick.get() >= ts.runtime_load_start_tick.get());

    monitor().reset();
}
