//! Fault point injection for testing atomicity
//!
//! A `FaultInjector` belongs to one `Database`. Tests arm a named point with
//! a hit count; the write path calls `check` at that point and fails the
//! current transaction when the armed hit is reached. Unarmed points cost
//! one mutex lock and a map lookup.
//!
//! ```ignore
//! db.faults().arm(points::REINDEX_ROW, 2); // fail on the 2nd shifted row
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Named points in the write path
pub mod points {
    /// Before each existing order row is moved to a new position
    pub const REINDEX_ROW: &str = "reindex_row";
    /// After the transaction closure succeeded, before the WAL append
    pub const WAL_BEFORE_APPEND: &str = "wal_before_append";

    /// All defined fault point names
    pub fn all() -> &'static [&'static str] {
        &[REINDEX_ROW, WAL_BEFORE_APPEND]
    }
}

/// Per-database registry of armed fault points
#[derive(Debug, Default)]
pub struct FaultInjector {
    /// Point name -> remaining hits before firing
    armed: Mutex<HashMap<&'static str, u32>>,
}

impl FaultInjector {
    /// Create an injector with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `point` to fire on its `hit`-th check (1 = next check).
    ///
    /// A point fires once and then disarms itself.
    pub fn arm(&self, point: &'static str, hit: u32) {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        armed.insert(point, hit.max(1));
    }

    /// Disarm every point
    pub fn disarm_all(&self) {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns whether `point` is currently armed
    pub fn is_armed(&self, point: &str) -> bool {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(point)
    }

    /// Record a hit on `point`; returns true if the fault fires now.
    pub fn check(&self, point: &str) -> bool {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        let fire = match armed.get_mut(point) {
            Some(remaining) if *remaining <= 1 => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        };
        if fire {
            armed.remove(point);
        }
        fire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_point_never_fires() {
        let faults = FaultInjector::new();
        for _ in 0..10 {
            assert!(!faults.check(points::REINDEX_ROW));
        }
    }

    #[test]
    fn test_fires_on_requested_hit_then_disarms() {
        let faults = FaultInjector::new();
        faults.arm(points::REINDEX_ROW, 3);

        assert!(!faults.check(points::REINDEX_ROW));
        assert!(!faults.check(points::REINDEX_ROW));
        assert!(faults.check(points::REINDEX_ROW));
        assert!(!faults.is_armed(points::REINDEX_ROW));
        assert!(!faults.check(points::REINDEX_ROW));
    }

    #[test]
    fn test_points_are_independent() {
        let faults = FaultInjector::new();
        faults.arm(points::WAL_BEFORE_APPEND, 1);

        assert!(!faults.check(points::REINDEX_ROW));
        assert!(faults.check(points::WAL_BEFORE_APPEND));
    }

    #[test]
    fn test_disarm_all() {
        let faults = FaultInjector::new();
        for &point in points::all() {
            faults.arm(point, 1);
        }
        faults.disarm_all();
        assert!(points::all().iter().all(|p| !faults.is_armed(p)));
    }
}
