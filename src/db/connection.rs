use std::{
    path::PathBuf,
    sync::mpsc,
    thread,
};

use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rusqlite::Connection;
use tokio::sync::oneshot;

use super::migrations::run_migrations;

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

/// Handle to the goal store. All SQLite access is serialized onto one
/// dedicated worker thread; async callers hop over via [`Database::execute`].
/// The worker exits once every handle is dropped.
#[derive(Clone)]
pub struct Database {
    sender: mpsc::Sender<DbTask>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (task_tx, task_rx) = mpsc::channel::<DbTask>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        thread::Builder::new()
            .name("goalmeme-db".into())
            .spawn(move || {
                let opened = Connection::open(&path_for_thread)
                    .context("failed to open SQLite database")
                    .and_then(|mut conn| {
                        conn.pragma_update(None, "foreign_keys", "ON")
                            .context("failed to enable foreign keys")?;
                        run_migrations(&mut conn).context("failed to run database migrations")?;
                        Ok(conn)
                    });

                let mut conn = match opened {
                    Ok(conn) => {
                        let _ = ready_tx.send(Ok(()));
                        conn
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                while let Ok(task) = task_rx.recv() {
                    task(&mut conn);
                }
                info!("Database thread shutting down");
            })
            .context("failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Goal store opened at {}", db_path.display());
        Ok(Self { sender: task_tx })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.sender
            .send(Box::new(move |conn| {
                if reply_tx.send(task(conn)).is_err() {
                    error!("DB caller dropped before receiving result");
                }
            }))
            .map_err(|_| anyhow!("database thread is no longer running"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }
}
