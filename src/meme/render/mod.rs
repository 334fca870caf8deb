//! Render tiers and the fallback chain over them.

mod basic;
mod compose;
pub mod layout;
mod remote;
mod text;

use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;

use super::{
    error::{MemeError, MemeResult},
    types::{CaptionRecord, RenderMethod, RenderResult},
};

pub use basic::BasicComposer;
pub use compose::{decorated_gradient, fit_onto_canvas, LocalComposer};
pub use layout::{layout_caption, wrap_text, DisplayFontMetrics, PlacedLine, TextMeasure};
pub use remote::{split_segments, RemoteCaptioner};
pub use text::TextRasterizer;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

#[async_trait]
pub trait RenderStrategy: Send + Sync {
    fn method(&self) -> RenderMethod;

    async fn produce(&self, record: &CaptionRecord, rng: &mut StdRng) -> MemeResult<RenderResult>;
}

/// Try `tiers` in order, each bounded by `timeout`, then `terminal` without a
/// bound. Only a terminal failure is returned.
pub async fn render_with_fallback(
    record: &CaptionRecord,
    tiers: &[&dyn RenderStrategy],
    terminal: &dyn RenderStrategy,
    timeout: Duration,
    rng: &mut StdRng,
) -> MemeResult<RenderResult> {
    for tier in tiers {
        let name = tier.method().as_str();
        let failure = match tokio::time::timeout(timeout, tier.produce(record, rng)).await {
            Ok(Ok(result)) => {
                log_debug!("reward rendered by {name}");
                return Ok(result);
            }
            Ok(Err(err)) => err,
            Err(_) => MemeError::Timeout(timeout),
        };
        log_warn!("{name} tier failed, falling back: {failure}");
    }

    terminal.produce(record, rng).await.map_err(|err| {
        log_error!("terminal {} tier failed: {err}", terminal.method().as_str());
        match err {
            MemeError::Render(_) => err,
            other => MemeError::Render(other.to_string()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meme::types::{ImageContent, SubTone, Tone};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use std::time::Instant;

    /// Never answers within any reasonable timeout.
    struct Stalling;

    #[async_trait]
    impl RenderStrategy for Stalling {
        fn method(&self) -> RenderMethod {
            RenderMethod::LocalComposition
        }

        async fn produce(&self, _: &CaptionRecord, _: &mut StdRng) -> MemeResult<RenderResult> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(MemeError::Render("woke up".into()))
        }
    }

    /// Succeeds immediately, reporting `method`.
    struct Immediate(RenderMethod);

    #[async_trait]
    impl RenderStrategy for Immediate {
        fn method(&self) -> RenderMethod {
            self.0
        }

        async fn produce(&self, record: &CaptionRecord, _: &mut StdRng) -> MemeResult<RenderResult> {
            Ok(RenderResult {
                content: ImageContent::RemoteUrl("https://i.imgflip.com/ok.jpg".into()),
                method: self.0,
                source: record.clone(),
            })
        }
    }

    struct Failing;

    #[async_trait]
    impl RenderStrategy for Failing {
        fn method(&self) -> RenderMethod {
            RenderMethod::BasicComposition
        }

        async fn produce(&self, _: &CaptionRecord, _: &mut StdRng) -> MemeResult<RenderResult> {
            Err(MemeError::Io(std::io::Error::other("disk gone")))
        }
    }

    fn record() -> CaptionRecord {
        CaptionRecord {
            text: "Almost there!".into(),
            tone: Tone::Praise,
            sub_tone: SubTone::Motivational,
            template_id: "drake".into(),
            is_generated: false,
        }
    }

    #[tokio::test]
    async fn stalled_tier_times_out_into_the_next_one() {
        let secondary = Immediate(RenderMethod::RemoteService);
        let terminal = Immediate(RenderMethod::BasicComposition);
        let started = Instant::now();

        let result = render_with_fallback(
            &record(),
            &[&Stalling, &secondary],
            &terminal,
            Duration::from_millis(50),
            &mut StdRng::seed_from_u64(4),
        )
        .await
        .unwrap();

        assert_eq!(result.method, RenderMethod::RemoteService);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn terminal_failure_surfaces_as_render_error() {
        let err = render_with_fallback(
            &record(),
            &[&Stalling],
            &Failing,
            Duration::from_millis(20),
            &mut StdRng::seed_from_u64(4),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MemeError::Render(ref message) if message.contains("disk gone")));
    }
}
