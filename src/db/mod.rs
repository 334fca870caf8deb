mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use helpers::{format_date, DATE_FORMAT};
pub use models::{DailyGoal, MainActivity, SubActivity, Urgency};
