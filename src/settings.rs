use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

pub const DEFAULT_AI_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_AI_MODEL: &str = "llama3-8b-8192";
pub const DEFAULT_IMGFLIP_ENDPOINT: &str = "https://api.imgflip.com/caption_image";
/// Public demo account imgflip hands out for bots.
pub const DEFAULT_IMGFLIP_ACCOUNT: &str = "imgflip_hubot";
pub const DEFAULT_DOWNLOAD_PREFIX: &str = "my-daily-meme";

/// Everything the meme engine needs from the outside world. Credentials are
/// carried here and handed to the strategies explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemeSettings {
    pub ai_api_key: Option<String>,
    pub ai_endpoint: String,
    pub ai_model: String,
    pub imgflip_endpoint: String,
    pub imgflip_username: Option<String>,
    pub imgflip_password: Option<String>,
    /// Directory holding the template images referenced by the catalog.
    pub template_dir: Option<PathBuf>,
    /// Extra fonts (ttf/otf) for caption text, on top of the system fonts.
    pub font_dir: Option<PathBuf>,
    /// Probability of trying local composition before the remote service.
    pub local_weight: f64,
    pub request_timeout_secs: u64,
    pub download_prefix: String,
}

impl Default for MemeSettings {
    fn default() -> Self {
        Self {
            ai_api_key: None,
            ai_endpoint: DEFAULT_AI_ENDPOINT.into(),
            ai_model: DEFAULT_AI_MODEL.into(),
            imgflip_endpoint: DEFAULT_IMGFLIP_ENDPOINT.into(),
            imgflip_username: None,
            imgflip_password: None,
            template_dir: None,
            font_dir: None,
            local_weight: 0.6,
            request_timeout_secs: 10,
            download_prefix: DEFAULT_DOWNLOAD_PREFIX.into(),
        }
    }
}

impl MemeSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Configured key, ignoring blank values.
    pub fn ai_key(&self) -> Option<&str> {
        self.ai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn imgflip_credentials(&self) -> (String, String) {
        let pick = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(DEFAULT_IMGFLIP_ACCOUNT)
                .to_string()
        };
        (pick(&self.imgflip_username), pick(&self.imgflip_password))
    }

    /// Overlay values from the process environment. Only called at load time;
    /// nothing deeper in the engine reads the environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GROQ_API_KEY") {
            self.ai_api_key = Some(key);
        }
        if let Some(user) = non_empty("IMGFLIP_USERNAME") {
            self.imgflip_username = Some(user);
        }
        if let Some(password) = non_empty("IMGFLIP_PASSWORD") {
            self.imgflip_password = Some(password);
        }
        if let Some(dir) = non_empty("GOALMEME_TEMPLATE_DIR") {
            self.template_dir = Some(PathBuf::from(dir));
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    #[serde(default)]
    meme: MemeSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored settings with environment overrides applied on top.
    pub fn meme(&self) -> MemeSettings {
        let mut settings = match self.data.read() {
            Ok(guard) => guard.meme.clone(),
            Err(poisoned) => poisoned.into_inner().meme.clone(),
        };
        settings.apply_env();
        settings
    }

    pub fn update_meme(&self, settings: MemeSettings) -> Result<()> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.meme = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
