pub mod coaching;
pub mod competition;
pub mod goal;
pub mod workout;

pub use coaching::{CoachingHistory, GoalRecommendation};
pub use competition::{
  Competition, CompetitionType, CompetitionUpdate, NewCompetition, NewRegistrationPeriod, Participant,
  RegistrationEntry, RegistrationPeriod,
};
pub use goal::{GoalMetric, GoalPeriod, NewPersonalGoal, PersonalGoal};
pub use workout::{NewWorkout, SharingType, ValidationError, Workout, WorkoutType};
