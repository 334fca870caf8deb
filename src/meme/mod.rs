//! Reward meme engine: tone, caption tiers, render tiers and the
//! orchestrator that chains them so a reward image always comes back.

pub mod artifact;
pub mod caption;
pub mod controller;
pub mod error;
pub mod orchestrator;
pub mod render;
pub mod templates;
pub mod tone;
pub mod types;

pub use artifact::{download_filename, save_reward, share_text};
pub use caption::{CaptionChain, CaptionRequest, CaptionStrategy, StaticCaptions};
pub use controller::{RewardController, RewardState};
pub use error::{MemeError, MemeResult};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use render::RenderStrategy;
pub use templates::{TemplateCatalog, TemplateDescriptor, TextAreas};
pub use tone::select_tone;
pub use types::{CaptionRecord, ImageContent, RenderMethod, RenderResult, SubTone, Tone};
