//! Goal-related data models.
//!
//! One `DailyGoal` per calendar day, decomposed into `MainActivity` rows which
//! may in turn carry `SubActivity` checklists.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Urgency {
    Low,
    #[default]
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            other => Err(anyhow!("unknown urgency '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubActivity {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MainActivity {
    pub id: String,
    pub title: String,
    pub urgency: Urgency,
    pub completed: bool,
    pub sub_activities: Vec<SubActivity>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyGoal {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Calendar day the goal belongs to, serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub activities: Vec<MainActivity>,
    pub created_at: DateTime<Utc>,
}

impl DailyGoal {
    /// A goal with no activities yet, stamped with a fresh id.
    pub fn new(title: impl Into<String>, description: Option<String>, date: NaiveDate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            description,
            date,
            activities: Vec::new(),
            created_at: Utc::now(),
        }
    }
}
