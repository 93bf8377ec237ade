//! Progressive-overload recommendations.
//!
//! Reads what an athlete just lifted, compares it against the rep-range
//! policy for the exercise kind, and prescribes the next session's
//! weight and set count. Preview and apply are separate so a UI can
//! show the recommendation live and persist it once, on confirmation.

mod calculator;
mod policy;
mod store;

pub use calculator::{
    apply_recommendation, decide, is_preview_different, preview, recommendations_for_session,
    Recommendation,
};
pub use policy::{rep_range_for, RepRange};
pub use store::{ProgressionError, ProgressionStore};
