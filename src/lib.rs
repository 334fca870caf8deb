pub mod db;
pub mod meme;
pub mod progress;
pub mod settings;
mod utils;

use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;

use db::Database;
use meme::{orchestrator::default_template_dir, Orchestrator, RewardController};
use settings::{MemeSettings, SettingsStore};

pub use utils::init_logging;

pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
}

impl AppState {
    /// Open the store and settings under `data_dir`, archiving a goal left
    /// over from an earlier day.
    pub async fn open(data_dir: &Path, today: NaiveDate) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join("goalmeme.sqlite3"))?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        db.roll_over_stale(today).await?;

        Ok(Self { db, settings })
    }

    /// Meme settings with the template directory defaulted under `data_dir`.
    pub fn meme_settings(&self, data_dir: &Path) -> MemeSettings {
        let mut settings = self.settings.meme();
        if settings.template_dir.is_none() {
            settings.template_dir = Some(default_template_dir(data_dir));
        }
        settings
    }

    pub fn reward_controller(&self, data_dir: &Path, seed: Option<u64>) -> Result<RewardController> {
        let mut builder = Orchestrator::builder(self.meme_settings(data_dir));
        if let Some(seed) = seed {
            builder = builder.seed(seed);
        }
        let orchestrator = builder.build().context("failed to set up the meme engine")?;
        Ok(RewardController::new(Arc::new(orchestrator)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn opening_rolls_over_a_stale_goal() {
        let dir = TempDir::new().unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();

        {
            let state = AppState::open(dir.path(), today - Duration::days(1)).await.unwrap();
            state
                .db
                .set_goal("Yesterday".into(), None, today - Duration::days(1))
                .await
                .unwrap();
        }

        let state = AppState::open(dir.path(), today).await.unwrap();
        assert!(state.db.current_goal().await.unwrap().is_none());
        assert_eq!(state.db.history().await.unwrap().len(), 1);
        assert_eq!(
            state.meme_settings(dir.path()).template_dir,
            Some(dir.path().join("templates"))
        );
    }
}
