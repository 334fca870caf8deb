use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::db::DailyGoal;

use super::{artifact::save_reward, orchestrator::Orchestrator, types::RenderResult};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone)]
pub enum RewardState {
    Idle,
    Generating { sequence: u64 },
    Ready { sequence: u64, reward: Arc<RenderResult> },
    Failed { sequence: u64, message: String },
}

impl RewardState {
    pub fn sequence(&self) -> Option<u64> {
        match self {
            RewardState::Idle => None,
            RewardState::Generating { sequence }
            | RewardState::Ready { sequence, .. }
            | RewardState::Failed { sequence, .. } => Some(*sequence),
        }
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, RewardState::Generating { .. })
    }
}

/// Last-write-wins front for the orchestrator. Every request gets a sequence
/// number; a result is published only while its number is still the latest,
/// and starting a request cancels the one in flight.
pub struct RewardController {
    orchestrator: Arc<Orchestrator>,
    sequence: AtomicU64,
    state: Mutex<RewardState>,
    in_flight: std::sync::Mutex<Option<CancellationToken>>,
}

impl RewardController {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            sequence: AtomicU64::new(0),
            state: Mutex::new(RewardState::Idle),
            in_flight: std::sync::Mutex::new(None),
        }
    }

    pub async fn state(&self) -> RewardState {
        self.state.lock().await.clone()
    }

    /// Start a new generation and wait for it. The returned state is whatever
    /// is current when this request settles, which may belong to a newer one.
    pub async fn regenerate(&self, completed: u32, total: u32, goal: &DailyGoal) -> RewardState {
        let (sequence, token) = self.begin();
        self.mark_generating(sequence).await;

        let outcome = tokio::select! {
            result = self.orchestrator.generate_reward(completed, total, goal) => Some(result),
            _ = token.cancelled() => None,
        };

        match outcome {
            Some(Ok(reward)) => {
                self.publish(
                    sequence,
                    RewardState::Ready {
                        sequence,
                        reward: Arc::new(reward),
                    },
                )
                .await
            }
            Some(Err(err)) => {
                log_warn!("reward generation {sequence} failed: {err}");
                self.publish(
                    sequence,
                    RewardState::Failed {
                        sequence,
                        message: format!("Couldn't make your meme ({err}). Try again."),
                    },
                )
                .await
            }
            None => {
                log_info!("reward generation {sequence} superseded");
                self.state().await
            }
        }
    }

    /// Write the current reward to `dir`. `None` when nothing is ready.
    pub async fn save_current(&self, dir: &Path, today: NaiveDate) -> Result<Option<PathBuf>> {
        let reward = match self.state().await {
            RewardState::Ready { reward, .. } => reward,
            _ => return Ok(None),
        };

        let path = save_reward(
            &reward,
            dir,
            self.orchestrator.download_prefix(),
            today,
            self.orchestrator.http_client(),
            self.orchestrator.request_timeout(),
        )
        .await
        .with_context(|| format!("failed to save reward into {}", dir.display()))?;
        Ok(Some(path))
    }

    /// Allocate the next sequence and swap in its token under one lock, so
    /// the token in the slot always belongs to the newest request.
    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut slot = match self.in_flight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = slot.replace(token.clone()) {
            previous.cancel();
        }
        (sequence, token)
    }

    async fn mark_generating(&self, sequence: u64) {
        let mut state = self.state.lock().await;
        if sequence == self.sequence.load(Ordering::SeqCst) {
            *state = RewardState::Generating { sequence };
        }
    }

    async fn publish(&self, sequence: u64, next: RewardState) -> RewardState {
        let mut state = self.state.lock().await;
        if sequence == self.sequence.load(Ordering::SeqCst) {
            *state = next;
        } else {
            log_info!("dropping stale reward {sequence}");
        }
        state.clone()
    }
}
