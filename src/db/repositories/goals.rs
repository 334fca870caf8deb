use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    connection::Database,
    helpers::{format_date, parse_date, parse_datetime, require_title},
    models::{DailyGoal, MainActivity, SubActivity, Urgency},
};

fn row_to_goal(row: &Row) -> Result<DailyGoal> {
    let goal_date: String = row.get("goal_date")?;
    let created_at: String = row.get("created_at")?;

    Ok(DailyGoal {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        date: parse_date(&goal_date, "goal_date")?,
        activities: Vec::new(),
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_activity(row: &Row) -> Result<MainActivity> {
    let urgency: String = row.get("urgency")?;
    let created_at: String = row.get("created_at")?;

    Ok(MainActivity {
        id: row.get("id")?,
        title: row.get("title")?,
        urgency: Urgency::parse(&urgency)?,
        completed: row.get("completed")?,
        sub_activities: Vec::new(),
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn row_to_sub_activity(row: &Row) -> Result<SubActivity> {
    let created_at: String = row.get("created_at")?;

    Ok(SubActivity {
        id: row.get("id")?,
        title: row.get("title")?,
        completed: row.get("completed")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

fn load_sub_activities(conn: &Connection, activity_id: &str) -> Result<Vec<SubActivity>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, completed, created_at
         FROM sub_activities
         WHERE activity_id = ?1
         ORDER BY position ASC",
    )?;

    let mut rows = stmt.query(params![activity_id])?;
    let mut subs = Vec::new();
    while let Some(row) = rows.next()? {
        subs.push(row_to_sub_activity(row)?);
    }
    Ok(subs)
}

fn load_activities(conn: &Connection, goal_id: &str) -> Result<Vec<MainActivity>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, urgency, completed, created_at
         FROM activities
         WHERE goal_id = ?1
         ORDER BY position ASC",
    )?;

    let mut rows = stmt.query(params![goal_id])?;
    let mut activities = Vec::new();
    while let Some(row) = rows.next()? {
        activities.push(row_to_activity(row)?);
    }

    for activity in &mut activities {
        activity.sub_activities = load_sub_activities(conn, &activity.id)?;
    }
    Ok(activities)
}

fn load_goal(conn: &Connection, goal_id: &str) -> Result<Option<DailyGoal>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, goal_date, created_at
         FROM goals
         WHERE id = ?1",
    )?;

    let mut rows = stmt.query(params![goal_id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let mut goal = row_to_goal(row)?;
    goal.activities = load_activities(conn, &goal.id)?;
    Ok(Some(goal))
}

fn current_goal_id(conn: &Connection) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM goals WHERE archived_at IS NULL ORDER BY created_at DESC LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(id)
}

fn require_current_goal_id(conn: &Connection) -> Result<String> {
    current_goal_id(conn)?.ok_or_else(|| anyhow!("no goal set for today"))
}

fn next_position(conn: &Connection, sql: &str, parent_id: &str) -> Result<i64> {
    let position: i64 = conn.query_row(sql, params![parent_id], |row| row.get(0))?;
    Ok(position)
}

fn archive_goal(conn: &Connection, goal_id: &str) -> Result<()> {
    conn.execute(
        "UPDATE goals SET archived_at = ?1 WHERE id = ?2",
        params![Utc::now().to_rfc3339(), goal_id],
    )?;
    Ok(())
}

/// An activity with a checklist is complete exactly when every item is.
/// Activities whose checklist has been emptied keep their last state.
fn sync_activity_completion(conn: &Connection, activity_id: &str) -> Result<()> {
    let (total, done): (i64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(completed), 0) FROM sub_activities WHERE activity_id = ?1",
        params![activity_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    if total > 0 {
        conn.execute(
            "UPDATE activities SET completed = ?1 WHERE id = ?2",
            params![total == done, activity_id],
        )?;
    }
    Ok(())
}

fn parent_activity_of(conn: &Connection, sub_id: &str) -> Result<String> {
    conn.query_row(
        "SELECT activity_id FROM sub_activities WHERE id = ?1",
        params![sub_id],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .ok_or_else(|| anyhow!("sub-activity {sub_id} not found"))
}

impl Database {
    /// Set today's goal. An existing current goal is edited in place (its
    /// activities survive); otherwise a new goal is created for `date`.
    pub async fn set_goal(
        &self,
        title: String,
        description: Option<String>,
        date: NaiveDate,
    ) -> Result<DailyGoal> {
        self.execute(move |conn| {
            let title = require_title(&title, "goal")?;
            let description = description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty());

            let tx = conn.transaction()?;
            let goal_id = match current_goal_id(&tx)? {
                Some(existing) => {
                    tx.execute(
                        "UPDATE goals SET title = ?1, description = ?2 WHERE id = ?3",
                        params![title, description, existing],
                    )?;
                    existing
                }
                None => {
                    let goal = DailyGoal::new(title, description, date);
                    tx.execute(
                        "INSERT INTO goals (id, title, description, goal_date, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            goal.id,
                            goal.title,
                            goal.description,
                            format_date(goal.date),
                            goal.created_at.to_rfc3339(),
                        ],
                    )?;
                    goal.id
                }
            };

            let goal = load_goal(&tx, &goal_id)?
                .ok_or_else(|| anyhow!("goal not found after save"))?;
            tx.commit()?;
            Ok(goal)
        })
        .await
    }

    pub async fn current_goal(&self) -> Result<Option<DailyGoal>> {
        self.execute(|conn| match current_goal_id(conn)? {
            Some(id) => load_goal(conn, &id),
            None => Ok(None),
        })
        .await
    }

    pub async fn add_activity(&self, title: String, urgency: Urgency) -> Result<MainActivity> {
        self.execute(move |conn| {
            let title = require_title(&title, "activity")?;
            let goal_id = require_current_goal_id(conn)?;
            let position = next_position(
                conn,
                "SELECT COALESCE(MAX(position) + 1, 0) FROM activities WHERE goal_id = ?1",
                &goal_id,
            )?;

            let activity = MainActivity {
                id: Uuid::new_v4().to_string(),
                title,
                urgency,
                completed: false,
                sub_activities: Vec::new(),
                created_at: Utc::now(),
            };

            conn.execute(
                "INSERT INTO activities (id, goal_id, title, urgency, completed, position, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6)",
                params![
                    activity.id,
                    goal_id,
                    activity.title,
                    activity.urgency.as_str(),
                    position,
                    activity.created_at.to_rfc3339(),
                ],
            )?;

            Ok(activity)
        })
        .await
    }

    pub async fn update_activity(
        &self,
        activity_id: String,
        title: Option<String>,
        urgency: Option<Urgency>,
    ) -> Result<()> {
        self.execute(move |conn| {
            if title.is_none() && urgency.is_none() {
                return Err(anyhow!("No fields to update"));
            }

            if let Some(title) = title {
                let title = require_title(&title, "activity")?;
                conn.execute(
                    "UPDATE activities SET title = ?1 WHERE id = ?2",
                    params![title, activity_id],
                )?;
            }
            if let Some(urgency) = urgency {
                conn.execute(
                    "UPDATE activities SET urgency = ?1 WHERE id = ?2",
                    params![urgency.as_str(), activity_id],
                )?;
            }

            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM activities WHERE id = ?1)",
                params![activity_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(anyhow!("activity {activity_id} not found"));
            }
            Ok(())
        })
        .await
    }

    /// Flip an activity. Its checklist, if any, follows the new state.
    pub async fn toggle_activity(&self, activity_id: String) -> Result<bool> {
        self.execute(move |conn| {
            let current: bool = conn
                .query_row(
                    "SELECT completed FROM activities WHERE id = ?1",
                    params![activity_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or_else(|| anyhow!("activity {activity_id} not found"))?;
            let next = !current;

            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE activities SET completed = ?1 WHERE id = ?2",
                params![next, activity_id],
            )?;
            tx.execute(
                "UPDATE sub_activities SET completed = ?1 WHERE activity_id = ?2",
                params![next, activity_id],
            )?;
            tx.commit()?;
            Ok(next)
        })
        .await
    }

    pub async fn delete_activity(&self, activity_id: String) -> Result<()> {
        self.execute(move |conn| {
            let rows = conn.execute("DELETE FROM activities WHERE id = ?1", params![activity_id])?;
            if rows == 0 {
                return Err(anyhow!("activity {activity_id} not found"));
            }
            Ok(())
        })
        .await
    }

    pub async fn add_sub_activity(&self, activity_id: String, title: String) -> Result<SubActivity> {
        self.execute(move |conn| {
            let title = require_title(&title, "sub-activity")?;
            let position = next_position(
                conn,
                "SELECT COALESCE(MAX(position) + 1, 0) FROM sub_activities WHERE activity_id = ?1",
                &activity_id,
            )?;

            let sub = SubActivity {
                id: Uuid::new_v4().to_string(),
                title,
                completed: false,
                created_at: Utc::now(),
            };

            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT INTO sub_activities (id, activity_id, title, completed, position, created_at)
                 SELECT ?1, id, ?2, 0, ?3, ?4 FROM activities WHERE id = ?5",
                params![
                    sub.id,
                    sub.title,
                    position,
                    sub.created_at.to_rfc3339(),
                    activity_id,
                ],
            )?;
            if inserted == 0 {
                return Err(anyhow!("activity {activity_id} not found"));
            }
            sync_activity_completion(&tx, &activity_id)?;
            tx.commit()?;
            Ok(sub)
        })
        .await
    }

    pub async fn toggle_sub_activity(&self, sub_id: String) -> Result<bool> {
        self.execute(move |conn| {
            let activity_id = parent_activity_of(conn, &sub_id)?;

            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE sub_activities SET completed = NOT completed WHERE id = ?1",
                params![sub_id],
            )?;
            let completed: bool = tx.query_row(
                "SELECT completed FROM sub_activities WHERE id = ?1",
                params![sub_id],
                |row| row.get(0),
            )?;
            sync_activity_completion(&tx, &activity_id)?;
            tx.commit()?;
            Ok(completed)
        })
        .await
    }

    pub async fn delete_sub_activity(&self, sub_id: String) -> Result<()> {
        self.execute(move |conn| {
            let activity_id = parent_activity_of(conn, &sub_id)?;

            let tx = conn.transaction()?;
            tx.execute("DELETE FROM sub_activities WHERE id = ?1", params![sub_id])?;
            sync_activity_completion(&tx, &activity_id)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    /// Move the current goal into history. Returns the archived goal, if any.
    pub async fn complete_day(&self) -> Result<Option<DailyGoal>> {
        self.execute(|conn| {
            let Some(goal_id) = current_goal_id(conn)? else {
                return Ok(None);
            };
            archive_goal(conn, &goal_id)?;
            load_goal(conn, &goal_id)
        })
        .await
    }

    /// Archive the current goal when it belongs to a day other than `today`.
    pub async fn roll_over_stale(&self, today: NaiveDate) -> Result<bool> {
        self.execute(move |conn| {
            let stale: Option<String> = conn
                .query_row(
                    "SELECT id FROM goals WHERE archived_at IS NULL AND goal_date <> ?1 LIMIT 1",
                    params![format_date(today)],
                    |row| row.get(0),
                )
                .optional()?;

            match stale {
                Some(goal_id) => {
                    archive_goal(conn, &goal_id)?;
                    log::info!("Moved stale goal {goal_id} into history");
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    /// Archived goals, most recent day first.
    pub async fn history(&self) -> Result<Vec<DailyGoal>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, goal_date, created_at
                 FROM goals
                 WHERE archived_at IS NOT NULL
                 ORDER BY goal_date DESC, archived_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut goals = Vec::new();
            while let Some(row) = rows.next()? {
                goals.push(row_to_goal(row)?);
            }
            drop(rows);

            for goal in &mut goals {
                goal.activities = load_activities(conn, &goal.id)?;
            }
            Ok(goals)
        })
        .await
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.execute(|conn| {
            conn.execute_batch(
                "DELETE FROM sub_activities;
                 DELETE FROM activities;
                 DELETE FROM goals;",
            )?;
            Ok(())
        })
        .await
    }
}
