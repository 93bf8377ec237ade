//! Rep-range policies by exercise kind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive rep range a working set is judged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepRange {
    pub min: i64,
    pub max: i64,
}

impl RepRange {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl fmt::Display for RepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// The rep range prescribed for an exercise kind. Unrecognized kinds
/// fall back to the heavy 6-8 range.
pub fn rep_range_for(kind: i64) -> RepRange {
    match kind {
        2 => RepRange::new(8, 10),
        3 => RepRange::new(10, 12),
        4 => RepRange::new(12, 15),
        _ => RepRange::new(6, 8),
    }
}
