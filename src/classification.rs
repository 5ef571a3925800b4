//! Module origin classification for distinguishing user modules from
//! system-provided ones.
//!
//! A module is "system" when its resolved path starts with one of a fixed,
//! ordered list of well-known system library locations. The match is a plain
//! case-sensitive prefix test from the start of the string, first match wins.
//! Everything else — application frameworks, bundled libraries, paths that
//! could not be resolved — counts as user code, because that is the side the
//! embedder can actually optimize.

/// Well-known system library path prefixes, tested in order.
const SYSTEM_PATH_PREFIXES: &[&str] = &[
    "/usr/lib/",
    "/usr/lib64/",
    "/usr/libexec/",
    "/lib/",
    "/lib64/",
];

/// Classify a module path as system-provided.
///
/// # Examples
///
/// ```
/// use launch_scope::classification::is_system_module;
///
/// assert!(is_system_module("/usr/lib/x86_64-linux-gnu/libssl.so.3"));
/// assert!(!is_system_module("/opt/myapp/lib/libplugin.so"));
/// ```
#[must_use]
pub fn is_system_module(path: &str) -> bool {
    SYSTEM_PATH_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Extract the base filename from a module path.
///
/// Returns the substring after the last path separator, or the whole string
/// if there is none.
#[must_use]
pub fn module_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
