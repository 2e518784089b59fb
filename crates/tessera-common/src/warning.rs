//! De-duplicated warnings for degraded input.
//!
//! Box construction is fail-open: an unknown display keyword or a malformed
//! style never aborts a build. The first occurrence of each distinct problem
//! is reported through the `log` facade; repeats are swallowed so a large
//! document does not flood the log.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Global set of warnings we've already emitted (to deduplicate)
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about unsupported or malformed input (emitted once per unique message).
///
/// Returns `true` if the warning was emitted, `false` if it was a repeat.
///
/// # Example
/// ```
/// use tessera_common::warning::warn_once;
///
/// let first = warn_once("style", "unsupported display value 'ruby'");
/// let again = warn_once("style", "unsupported display value 'ruby'");
/// assert!(first || !again);
/// ```
pub fn warn_once(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    // A poisoned set only means another thread panicked mid-insert; the set
    // itself is still usable.
    let fresh = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if fresh {
        log::warn!(target: "tessera", "[{component}] {message}");
    }
    fresh
}

/// Clear all recorded warnings (call when starting on a new document)
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}
