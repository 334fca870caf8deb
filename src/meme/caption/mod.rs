//! Caption tiers and the chain that tries them in order.

mod ai;
mod clean;
mod pool;

use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::{
    error::{MemeError, MemeResult},
    templates::template_pool,
    types::{CaptionRecord, SubTone, Tone},
};

pub use ai::AiCaptioner;
pub use clean::clean_completion;
pub use pool::{phrases_for, StaticCaptions};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Inputs for one caption, frozen when the request starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionRequest {
    pub sub_tone: SubTone,
    pub completed: u32,
    pub total: u32,
    pub goal_title: String,
}

#[async_trait]
pub trait CaptionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn produce(
        &self,
        request: &CaptionRequest,
        rng: &mut StdRng,
    ) -> MemeResult<CaptionRecord>;
}

/// Uniform pick from the tone's template pool, independent of the text.
pub fn pick_template(tone: Tone, rng: &mut StdRng) -> String {
    template_pool(tone)
        .choose(rng)
        .copied()
        .unwrap_or("success_kid")
        .to_string()
}

/// Tries each tier under a timeout and falls back to the static pool. Never
/// fails and never returns empty text.
pub struct CaptionChain {
    tiers: Vec<Box<dyn CaptionStrategy>>,
    fallback: StaticCaptions,
    timeout: Duration,
}

impl CaptionChain {
    pub fn new(tiers: Vec<Box<dyn CaptionStrategy>>, timeout: Duration) -> Self {
        Self {
            tiers,
            fallback: StaticCaptions,
            timeout,
        }
    }

    pub fn static_only() -> Self {
        Self::new(Vec::new(), Duration::from_secs(10))
    }

    pub async fn generate(&self, request: &CaptionRequest, rng: &mut StdRng) -> CaptionRecord {
        for tier in &self.tiers {
            let attempt = tokio::time::timeout(self.timeout, tier.produce(request, rng)).await;
            let failure = match attempt {
                Ok(Ok(record)) if !record.text.trim().is_empty() => {
                    log_debug!("caption from {} tier: {}", tier.name(), record.text);
                    return record;
                }
                Ok(Ok(_)) => MemeError::EmptyCompletion,
                Ok(Err(err)) => err,
                Err(_) => MemeError::Timeout(self.timeout),
            };
            log_warn!("{} caption tier failed, falling back: {failure}", tier.name());
        }

        self.fallback.pick(request, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct Stalling;

    #[async_trait]
    impl CaptionStrategy for Stalling {
        fn name(&self) -> &'static str {
            "stalling"
        }

        async fn produce(&self, _: &CaptionRequest, _: &mut StdRng) -> MemeResult<CaptionRecord> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(MemeError::EmptyCompletion)
        }
    }

    struct Blank;

    #[async_trait]
    impl CaptionStrategy for Blank {
        fn name(&self) -> &'static str {
            "blank"
        }

        async fn produce(&self, request: &CaptionRequest, rng: &mut StdRng) -> MemeResult<CaptionRecord> {
            let mut record = StaticCaptions.pick(request, rng);
            record.text = "   ".into();
            record.is_generated = true;
            Ok(record)
        }
    }

    fn request() -> CaptionRequest {
        CaptionRequest {
            sub_tone: SubTone::Roast,
            completed: 0,
            total: 0,
            goal_title: "Taxes".into(),
        }
    }

    #[tokio::test]
    async fn hung_tier_times_out_into_static_fallback() {
        let chain = CaptionChain::new(vec![Box::new(Stalling)], Duration::from_millis(20));
        let record = chain.generate(&request(), &mut StdRng::seed_from_u64(3)).await;
        assert!(!record.text.is_empty());
        assert!(!record.is_generated);
        assert_eq!(record.tone, Tone::Roast);
    }

    #[tokio::test]
    async fn blank_text_is_never_returned() {
        let chain = CaptionChain::new(vec![Box::new(Blank)], Duration::from_secs(1));
        let record = chain.generate(&request(), &mut StdRng::seed_from_u64(3)).await;
        assert!(!record.text.trim().is_empty());
        assert!(!record.is_generated);
    }
}
