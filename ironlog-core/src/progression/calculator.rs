//! The progressive-overload calculator.
//!
//! Given the sets just logged for one exercise performance and the
//! athlete's persisted training state, decide the next prescribed
//! weight and volume and explain the decision. `decide` is pure;
//! `preview` reads through a [`ProgressionStore`] without writing,
//! `apply_recommendation` persists the result.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::policy::{rep_range_for, RepRange};
use super::store::{ProgressionError, ProgressionStore};
use crate::models::{Exercise, ExerciseState, LoggedSet};
use crate::record_id::RecordId;

/// A set is counted as a failure signal when perceived exertion reaches
/// this level, even if the reps landed inside the range.
const HIGH_EFFORT_RPE: f64 = 8.5;

/// Above this effort a successful performance holds rather than adds
/// load.
const CONFIDENT_EFFORT_RPE: f64 = 8.0;

/// Misses in a row before the working-set count is reduced.
const REDUCTION_TRIGGER: i64 = 2;

/// Successes in a row, while reduced, before full volume is restored.
const RESTORE_TRIGGER: i64 = 2;

/// The calculator's output: the next prescription, the reasoning, and
/// the state record an apply would persist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub exercise_id: RecordId,
    pub next_weight_kg: f64,
    pub next_sets: i64,
    pub target_range: RepRange,
    pub explanation: String,
    pub updated_state: ExerciseState,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} kg x {} sets ({}): {}",
            self.next_weight_kg, self.next_sets, self.target_range, self.explanation
        )
    }
}

/// Decides the next prescription from one performance.
///
/// Only the first `current_sets` logged sets, by position, count as
/// working sets. With no working sets the state passes through
/// unchanged. The first working set's weight is the baseline the
/// decision operates on, so a state that has never been trained picks
/// its weight up from the first logged session.
pub fn decide(exercise: &Exercise, state: &ExerciseState, sets: &[LoggedSet]) -> Recommendation {
    let range = rep_range_for(exercise.kind);

    let mut ordered: Vec<&LoggedSet> = sets.iter().collect();
    ordered.sort_by_key(|set| set.position);
    let working: Vec<&LoggedSet> = ordered
        .into_iter()
        .take(state.current_sets.max(0) as usize)
        .collect();

    if working.is_empty() {
        return Recommendation {
            exercise_id: exercise.id.clone(),
            next_weight_kg: state.working_weight_kg,
            next_sets: state.current_sets,
            target_range: range,
            explanation: "No sets logged yet; prescription unchanged.".to_string(),
            updated_state: state.clone(),
        };
    }

    let baseline = working[0].weight_kg;
    let effort = working.iter().filter_map(|set| set.rpe).reduce(f64::max);
    let succeeded = working.iter().all(|set| set.reps >= range.max);
    let failed = working.iter().any(|set| set.reps < range.min)
        || effort.map_or(false, |rpe| rpe >= HIGH_EFFORT_RPE);
    let confident = effort.map_or(true, |rpe| rpe <= CONFIDENT_EFFORT_RPE);

    let mut next = state.clone();
    let weight;
    let verdict;

    if succeeded && confident {
        weight = baseline + exercise.increment_kg;
        next.success_streak += 1;
        next.fail_streak = 0;
        verdict = format!(
            "Hit {} reps or more on every set. Increase to {} kg.",
            range.max, weight
        );
    } else if succeeded {
        // Top of the range, but too close to the ceiling to add load.
        weight = baseline;
        verdict = format!(
            "Top of the {} range but effort was high. Holding {} kg.",
            range, weight
        );
    } else if failed {
        weight = baseline;
        next.fail_streak += 1;
        next.success_streak = 0;
        verdict = format!("Missed the {} range. Holding {} kg.", range, weight);
    } else {
        weight = baseline;
        verdict = format!("Working inside the {} range. Holding {} kg.", range, weight);
    }

    next.working_weight_kg = weight;

    // Volume state machine, evaluated after the weight decision. A
    // single pass can enter or leave reduction, never both.
    let mut fragments = vec![verdict];
    if !next.volume_reduced && next.fail_streak >= REDUCTION_TRIGGER {
        next.current_sets = (next.base_sets - 1).max(1);
        next.volume_reduced = true;
        next.success_streak = 0;
        next.fail_streak = 0;
        fragments.push(format!(
            "Two misses in a row; dropping to {} working sets.",
            next.current_sets
        ));
    } else if next.volume_reduced && next.success_streak >= RESTORE_TRIGGER {
        next.current_sets = next.base_sets;
        next.volume_reduced = false;
        next.success_streak = 0;
        next.fail_streak = 0;
        fragments.push(format!(
            "Back on track; restoring {} working sets.",
            next.current_sets
        ));
    }

    let explanation = fragments.join(" ");
    next.last_target_range = Some(range.to_string());
    next.last_recommendation = Some(explanation.clone());
    next.updated_at = chrono::Utc::now();

    Recommendation {
        exercise_id: exercise.id.clone(),
        next_weight_kg: weight,
        next_sets: next.current_sets,
        target_range: range,
        explanation,
        updated_state: next,
    }
}

/// Computes a recommendation for one exercise performance without
/// persisting anything.
///
/// The athlete's state defaults to a fresh one when none is persisted
/// yet, so the first session an exercise is logged still produces a
/// usable prescription.
pub async fn preview<S>(
    store: &S,
    exercise_id: &RecordId,
    performance_id: &RecordId,
    user_id: &str,
) -> Result<Recommendation, ProgressionError>
where
    S: ProgressionStore + ?Sized,
{
    let exercise = store
        .exercise(exercise_id)
        .await?
        .ok_or_else(|| ProgressionError::ExerciseNotFound(exercise_id.clone()))?;

    let state = match store.state_for(user_id, exercise_id).await? {
        Some(state) => state,
        None => ExerciseState::new(user_id, exercise_id.clone()),
    };

    let sets = store.sets_for_performance(performance_id).await?;
    Ok(decide(&exercise, &state, &sets))
}

/// Persists a recommendation's updated state.
pub async fn apply_recommendation<S>(
    store: &S,
    recommendation: &Recommendation,
) -> Result<(), ProgressionError>
where
    S: ProgressionStore + ?Sized,
{
    store.save_state(&recommendation.updated_state).await
}

/// Whether applying the recommendation would change the persisted
/// prescription.
pub fn is_preview_different(recommendation: &Recommendation, state: &ExerciseState) -> bool {
    !recommendation.updated_state.same_prescription(state)
}

/// Computes and applies progression for every exercise performed in a
/// session. Exercises are independent; one performance's outcome never
/// feeds another's.
pub async fn recommendations_for_session<S>(
    store: &S,
    session_id: &RecordId,
    user_id: &str,
) -> Result<Vec<Recommendation>, ProgressionError>
where
    S: ProgressionStore + ?Sized,
{
    let performances = store.performances_for_session(session_id).await?;
    debug!(session = %session_id, performances = performances.len(), "running session progression");

    futures::future::try_join_all(performances.iter().map(|performance| async move {
        let recommendation =
            preview(store, &performance.exercise_id, &performance.id, user_id).await?;
        apply_recommendation(store, &recommendation).await?;
        Ok(recommendation)
    }))
    .await
}
