//! Completion math over a goal's activities, plus history statistics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{DailyGoal, MainActivity};

/// Completed vs. total task counts for one goal, frozen at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSnapshot {
    pub completed: u32,
    pub total: u32,
}

impl CompletionSnapshot {
    pub fn new(completed: u32, total: u32) -> Self {
        Self { completed, total }
    }

    /// Activities with a checklist count one task per sub-activity; plain
    /// activities count as a single task.
    pub fn from_activities(activities: &[MainActivity]) -> Self {
        let mut completed = 0u32;
        let mut total = 0u32;

        for activity in activities {
            if activity.sub_activities.is_empty() {
                total += 1;
                if activity.completed {
                    completed += 1;
                }
            } else {
                total += activity.sub_activities.len() as u32;
                completed += activity
                    .sub_activities
                    .iter()
                    .filter(|sub| sub.completed)
                    .count() as u32;
            }
        }

        Self { completed, total }
    }

    /// `completed / total`, or 0 when there is nothing to do. Always in `[0, 1]`.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (f64::from(self.completed) / f64::from(self.total)).clamp(0.0, 1.0)
    }

    pub fn percent(&self) -> u32 {
        (self.rate() * 100.0).round() as u32
    }

    pub fn remaining(&self) -> u32 {
        self.total.saturating_sub(self.completed)
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }
}

pub fn is_goal_today(goal: Option<&DailyGoal>, today: NaiveDate) -> bool {
    goal.map(|g| g.date == today).unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalStats {
    pub total_goals: usize,
    pub completed_goals: usize,
    /// Mean completion over history, as a rounded percentage.
    pub average_completion: u32,
    /// Fully completed days at the head of history.
    pub current_streak: usize,
}

/// `history` is expected newest first, as returned by the store.
pub fn compute_stats(current: Option<&DailyGoal>, history: &[DailyGoal]) -> GoalStats {
    let rates: Vec<f64> = history
        .iter()
        .map(|goal| CompletionSnapshot::from_activities(&goal.activities).rate())
        .collect();

    let average = if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    };

    GoalStats {
        total_goals: history.len() + usize::from(current.is_some()),
        completed_goals: rates.iter().filter(|rate| **rate >= 1.0).count(),
        average_completion: (average * 100.0).round() as u32,
        current_streak: rates.iter().take_while(|rate| **rate >= 1.0).count(),
    }
}
