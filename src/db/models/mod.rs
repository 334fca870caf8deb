pub mod goal;

pub use goal::{DailyGoal, MainActivity, SubActivity, Urgency};
