//! Newtype wrappers for the opaque values the loader hands us.
//!
//! The loader callback delivers a native module reference and a relocation
//! offset. Neither has structure the monitor should depend on, so both are
//! wrapped as opaque newtypes: the handle is only ever forwarded to the
//! platform's reverse path lookup, and the offset is only ever stored.

use serde::Serialize;
use std::fmt;

/// Opaque reference to a loaded module, as supplied by the loader callback.
///
/// On the native backend this is the address of the module's image header,
/// usable as a key into the process's memory maps. The monitor itself never
/// interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModuleHandle(pub u64);

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module@{:#x}", self.0)
    }
}

/// Relocation offset ("slide") applied to a module by the loader.
///
/// Recorded verbatim; position-independent images get a nonzero offset.
pub type RelocationOffset = isize;
