mod exercise;
mod exercise_state;
mod health;
mod session;
mod set;
mod template;

pub use exercise::Exercise;
pub use exercise_state::ExerciseState;
pub use health::{HealthAttachment, HealthEntry};
pub use session::{Session, SessionExercise};
pub use set::LoggedSet;
pub use template::{TemplateItem, WorkoutTemplate};
