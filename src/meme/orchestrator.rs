//! Turns a day's completion counts into a reward image.
//!
//! One call runs tone selection, the caption chain and the render chain in
//! sequence. The only state kept between calls is the seed source that hands
//! each call its own [`StdRng`].

use std::{path::PathBuf, sync::Arc, sync::Mutex, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};
use reqwest::Client;

use crate::db::DailyGoal;
use crate::progress::CompletionSnapshot;
use crate::settings::MemeSettings;

use super::{
    caption::{AiCaptioner, CaptionChain, CaptionRequest, CaptionStrategy},
    error::MemeResult,
    render::{
        render_with_fallback, BasicComposer, LocalComposer, RemoteCaptioner,
        RenderStrategy, TextMeasure, TextRasterizer,
    },
    templates::TemplateCatalog,
    tone::tone_for,
    types::RenderResult,
};

const ENABLE_LOGS: bool = true;

use crate::log_info;

const DEFAULT_LOCAL_WEIGHT: f64 = 0.6;

pub struct Orchestrator {
    captions: CaptionChain,
    local: Arc<dyn RenderStrategy>,
    remote: Arc<dyn RenderStrategy>,
    terminal: Arc<dyn RenderStrategy>,
    local_weight: f64,
    timeout: Duration,
    seed_source: Mutex<StdRng>,
    http: Client,
    download_prefix: String,
}

impl Orchestrator {
    pub fn builder(settings: MemeSettings) -> OrchestratorBuilder {
        OrchestratorBuilder::new(settings)
    }

    pub fn from_settings(settings: MemeSettings) -> MemeResult<Self> {
        OrchestratorBuilder::new(settings).build()
    }

    /// Deterministic orchestrator: the same seed replays the same sequence of
    /// tone-independent choices (template, phrase, primary tier).
    pub fn with_seed(settings: MemeSettings, seed: u64) -> MemeResult<Self> {
        OrchestratorBuilder::new(settings).seed(seed).build()
    }

    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    pub fn http_client(&self) -> &Client {
        &self.http
    }

    pub fn download_prefix(&self) -> &str {
        &self.download_prefix
    }

    pub async fn generate_reward(
        &self,
        completed: u32,
        total: u32,
        goal: &DailyGoal,
    ) -> MemeResult<RenderResult> {
        let snapshot = CompletionSnapshot::new(completed, total);
        let sub_tone = tone_for(&snapshot);
        let request = CaptionRequest {
            sub_tone,
            completed,
            total,
            goal_title: goal.title.clone(),
        };
        let mut rng = self.next_rng();

        let caption = self.captions.generate(&request, &mut rng).await;

        let local_first = rng.gen_bool(self.local_weight);
        let order: [&dyn RenderStrategy; 2] = if local_first {
            [self.local.as_ref(), self.remote.as_ref()]
        } else {
            [self.remote.as_ref(), self.local.as_ref()]
        };
        log_info!(
            "generating {} reward for {}/{} (template {}, {} first)",
            sub_tone.as_str(),
            completed,
            total,
            caption.template_id,
            order[0].method().as_str()
        );

        render_with_fallback(
            &caption,
            &order,
            self.terminal.as_ref(),
            self.timeout,
            &mut rng,
        )
        .await
    }

    /// Reward for a goal's own progress.
    pub async fn generate_for_goal(&self, goal: &DailyGoal) -> MemeResult<RenderResult> {
        let snapshot = CompletionSnapshot::from_activities(&goal.activities);
        self.generate_reward(snapshot.completed, snapshot.total, goal)
            .await
    }

    fn next_rng(&self) -> StdRng {
        let mut source = match self.seed_source.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        StdRng::seed_from_u64(source.gen())
    }
}

/// Wires the default tiers from settings; any tier can be swapped out.
pub struct OrchestratorBuilder {
    settings: MemeSettings,
    catalog: Option<TemplateCatalog>,
    caption_tiers: Option<Vec<Box<dyn CaptionStrategy>>>,
    local: Option<Arc<dyn RenderStrategy>>,
    remote: Option<Arc<dyn RenderStrategy>>,
    terminal: Option<Arc<dyn RenderStrategy>>,
    seed: Option<u64>,
}

impl OrchestratorBuilder {
    pub fn new(settings: MemeSettings) -> Self {
        Self {
            settings,
            catalog: None,
            caption_tiers: None,
            local: None,
            remote: None,
            terminal: None,
            seed: None,
        }
    }

    pub fn catalog(mut self, catalog: TemplateCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn caption_tiers(mut self, tiers: Vec<Box<dyn CaptionStrategy>>) -> Self {
        self.caption_tiers = Some(tiers);
        self
    }

    pub fn local(mut self, strategy: Arc<dyn RenderStrategy>) -> Self {
        self.local = Some(strategy);
        self
    }

    pub fn remote(mut self, strategy: Arc<dyn RenderStrategy>) -> Self {
        self.remote = Some(strategy);
        self
    }

    pub fn terminal(mut self, strategy: Arc<dyn RenderStrategy>) -> Self {
        self.terminal = Some(strategy);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> MemeResult<Orchestrator> {
        let settings = self.settings;
        let timeout = settings.request_timeout();

        let text = Arc::new(TextRasterizer::new(settings.font_dir.as_deref()));
        let measure: Arc<dyn TextMeasure> = text.clone();
        let catalog = Arc::new(self.catalog.unwrap_or_default());

        let caption_tiers = match self.caption_tiers {
            Some(tiers) => tiers,
            None => vec![Box::new(AiCaptioner::from_settings(&settings)?) as Box<dyn CaptionStrategy>],
        };
        let local = match self.local {
            Some(strategy) => strategy,
            None => Arc::new(LocalComposer::new(
                catalog,
                settings.template_dir.clone(),
                timeout,
                text.clone(),
                measure.clone(),
            )?),
        };
        let remote = match self.remote {
            Some(strategy) => strategy,
            None => Arc::new(RemoteCaptioner::from_settings(&settings)?),
        };
        let terminal = self
            .terminal
            .unwrap_or_else(|| Arc::new(BasicComposer::new(text, measure)));

        let seed_source = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Orchestrator {
            captions: CaptionChain::new(caption_tiers, timeout),
            local,
            remote,
            terminal,
            local_weight: sanitize_weight(settings.local_weight),
            timeout,
            seed_source: Mutex::new(seed_source),
            http: Client::builder().timeout(timeout).build()?,
            download_prefix: settings.download_prefix,
        })
    }
}

fn sanitize_weight(weight: f64) -> f64 {
    if weight.is_finite() {
        weight.clamp(0.0, 1.0)
    } else {
        DEFAULT_LOCAL_WEIGHT
    }
}

/// Where template images resolve from when nothing is configured.
pub fn default_template_dir(data_dir: &std::path::Path) -> PathBuf {
    data_dir.join("templates")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meme::{
        artifact::download_filename,
        error::MemeError,
        templates::template_pool,
        types::{CaptionRecord, ImageContent, RenderMethod, SubTone, Tone},
    };
    use async_trait::async_trait;
    use chrono::Local;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::{matchers::method, Mock, MockServer, ResponseTemplate};

    struct Failing(RenderMethod);

    #[async_trait]
    impl RenderStrategy for Failing {
        fn method(&self) -> RenderMethod {
            self.0
        }

        async fn produce(&self, _: &CaptionRecord, _: &mut StdRng) -> MemeResult<RenderResult> {
            Err(MemeError::service(Some(503), "down"))
        }
    }

    struct Hosted;

    #[async_trait]
    impl RenderStrategy for Hosted {
        fn method(&self) -> RenderMethod {
            RenderMethod::RemoteService
        }

        async fn produce(&self, record: &CaptionRecord, _: &mut StdRng) -> MemeResult<RenderResult> {
            Ok(RenderResult {
                content: ImageContent::RemoteUrl("https://i.imgflip.com/ok.jpg".into()),
                method: RenderMethod::RemoteService,
                source: record.clone(),
            })
        }
    }

    fn offline_settings(local_weight: f64) -> MemeSettings {
        MemeSettings {
            ai_api_key: None,
            imgflip_endpoint: "http://127.0.0.1:9/caption_image".into(),
            template_dir: None,
            local_weight,
            request_timeout_secs: 2,
            ..MemeSettings::default()
        }
    }

    fn goal(title: &str) -> DailyGoal {
        DailyGoal::new(title, None, Local::now().date_naive())
    }

    #[tokio::test]
    async fn method_reports_the_tier_that_succeeded() {
        let orchestrator = Orchestrator::builder(offline_settings(1.0))
            .local(Arc::new(Failing(RenderMethod::LocalComposition)))
            .remote(Arc::new(Hosted))
            .seed(1)
            .build()
            .unwrap();

        let reward = orchestrator.generate_reward(3, 4, &goal("Gym")).await.unwrap();
        assert_eq!(reward.method, RenderMethod::RemoteService);
        assert_eq!(reward.remote_url(), Some("https://i.imgflip.com/ok.jpg"));
    }

    #[tokio::test]
    async fn all_tiers_failing_ends_in_basic_composition() {
        let orchestrator = Orchestrator::builder(offline_settings(0.6))
            .local(Arc::new(Failing(RenderMethod::LocalComposition)))
            .remote(Arc::new(Failing(RenderMethod::RemoteService)))
            .seed(9)
            .build()
            .unwrap();

        let reward = orchestrator.generate_reward(1, 10, &goal("Taxes")).await.unwrap();
        assert_eq!(reward.method, RenderMethod::BasicComposition);
        assert!(matches!(reward.content, ImageContent::Raster(_)));
    }

    #[tokio::test]
    async fn missing_template_and_failing_remote_still_render() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error_message": "nope"
            })))
            .mount(&server)
            .await;

        let mut settings = offline_settings(0.0);
        settings.imgflip_endpoint = format!("{}/caption_image", server.uri());
        let orchestrator = Orchestrator::with_seed(settings, 4).unwrap();

        // Remote goes first and fails; local synthesizes a background.
        let reward = orchestrator.generate_reward(2, 9, &goal("Read")).await.unwrap();
        assert_eq!(reward.method, RenderMethod::LocalComposition);
    }

    #[tokio::test]
    async fn chosen_template_belongs_to_the_tone_pool() {
        let orchestrator = Orchestrator::builder(offline_settings(1.0))
            .remote(Arc::new(Failing(RenderMethod::RemoteService)))
            .seed(42)
            .build()
            .unwrap();

        for (completed, total) in [(5, 5), (8, 10), (1, 10), (0, 3)] {
            for _ in 0..3 {
                let reward = orchestrator
                    .generate_reward(completed, total, &goal("Garden"))
                    .await
                    .unwrap();
                let caption = reward.caption();
                assert!(
                    template_pool(caption.tone).contains(&caption.template_id.as_str()),
                    "{} not in {:?} pool",
                    caption.template_id,
                    caption.tone
                );
            }
        }
    }

    #[tokio::test]
    async fn perfect_day_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let orchestrator = Orchestrator::builder(offline_settings(0.6))
            .remote(Arc::new(Failing(RenderMethod::RemoteService)))
            .build()
            .unwrap();

        let today = Local::now().date_naive();
        let reward = orchestrator
            .generate_reward(5, 5, &goal("Clean kitchen"))
            .await
            .unwrap();

        let caption = reward.caption();
        assert_eq!(caption.sub_tone, SubTone::Perfect);
        assert_eq!(caption.tone, Tone::Praise);
        assert!(caption.text.contains("Clean kitchen"), "{}", caption.text);

        let path = crate::meme::artifact::save_reward(
            &reward,
            dir.path(),
            orchestrator.download_prefix(),
            today,
            orchestrator.http_client(),
            orchestrator.request_timeout(),
        )
        .await
        .unwrap();
        let expected = format!("-{}.png", today.format("%Y-%m-%d"));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.ends_with(&expected), "{name}");
        assert_eq!(name, download_filename("my-daily-meme", today));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn empty_day_roasts_without_dividing_by_zero() {
        let orchestrator = Orchestrator::builder(offline_settings(1.0))
            .remote(Arc::new(Failing(RenderMethod::RemoteService)))
            .seed(3)
            .build()
            .unwrap();

        let reward = orchestrator.generate_reward(0, 0, &goal("Nothing")).await.unwrap();
        assert_eq!(reward.caption().sub_tone, SubTone::Roast);
        assert!(!reward.caption().text.is_empty());
    }

    #[test]
    fn weights_are_sanitized() {
        assert_eq!(sanitize_weight(f64::NAN), DEFAULT_LOCAL_WEIGHT);
        assert_eq!(sanitize_weight(1.7), 1.0);
        assert_eq!(sanitize_weight(-0.2), 0.0);
        assert_eq!(sanitize_weight(0.25), 0.25);
    }
}
