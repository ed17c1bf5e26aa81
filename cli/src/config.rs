use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::planner::ModelSelection;
use crate::types::UserSettings;

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_CONFIG_PATH: &str = "FLOWSTATE_CONFIG_PATH";
const ENV_API_KEY: &str = "FLOWSTATE_API_KEY";
const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
const ENV_BASE_URL: &str = "FLOWSTATE_BASE_URL";
const ENV_FAST_MODEL: &str = "FLOWSTATE_FAST_MODEL";
const ENV_DEEP_MODEL: &str = "FLOWSTATE_DEEP_MODEL";
const ENV_SPEECH_MODEL: &str = "FLOWSTATE_SPEECH_MODEL";
const ENV_VOICE: &str = "FLOWSTATE_VOICE";
const ENV_MIN_LATENCY_MS: &str = "FLOWSTATE_MIN_LATENCY_MS";
const ENV_REQUEST_TIMEOUT: &str = "FLOWSTATE_REQUEST_TIMEOUT_SECS";
const ENV_DEEP_REQUEST_TIMEOUT: &str = "FLOWSTATE_DEEP_REQUEST_TIMEOUT_SECS";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_SPEECH_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_VOICE: &str = "Kore";
const DEFAULT_MIN_LATENCY_MS: u64 = 800;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
// Deep runs spend a large thinking budget before answering.
const DEFAULT_DEEP_REQUEST_TIMEOUT_SECS: u64 = 900;

#[derive(Debug, Clone)]
pub struct AppConfig {
    api_key: Option<String>,
    base_url: String,
    models: ModelSelection,
    speech_model: String,
    voice: String,
    min_latency_ms: u64,
    request_timeout_secs: u64,
    deep_request_timeout_secs: u64,
    settings: UserSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        let path = match config_file_override() {
            Some(path) => path,
            None => Self::default_config_path()?,
        };
        if path.exists() {
            let partial = read_partial(&path)?;
            config.apply_partial(partial);
        }

        config.apply_env()?;
        config
            .settings
            .validate()
            .with_context(|| format!("invalid work-day settings in {}", path.display()))?;
        Ok(config)
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    pub fn speech_model(&self) -> &str {
        &self.speech_model
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    pub fn min_latency(&self) -> Duration {
        Duration::from_millis(self.min_latency_ms)
    }

    /// Timeout for fast plan requests and speech synthesis.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn deep_request_timeout(&self) -> Duration {
        Duration::from_secs(self.deep_request_timeout_secs)
    }

    pub fn settings(&self) -> &UserSettings {
        &self.settings
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("com", "FlowState", "FlowState")
            .ok_or_else(|| anyhow!("unable to determine config directory"))?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(key) = partial.api_key.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(url) = partial.base_url {
            self.base_url = url;
        }
        if let Some(model) = partial.fast_model {
            self.models.fast_model = model;
        }
        if let Some(model) = partial.deep_model {
            self.models.deep_model = model;
        }
        if let Some(model) = partial.speech_model {
            self.speech_model = model;
        }
        if let Some(voice) = partial.voice {
            self.voice = voice;
        }
        if let Some(ms) = partial.min_latency_ms {
            self.min_latency_ms = ms;
        }
        if let Some(secs) = partial.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = partial.deep_request_timeout_secs {
            self.deep_request_timeout_secs = secs;
        }
        if let Some(start) = partial.work_start {
            self.settings.work_start = start;
        }
        if let Some(end) = partial.work_end {
            self.settings.work_end = end;
        }
        if let Some(minutes) = partial.break_duration {
            self.settings.break_duration = minutes;
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        let key = non_empty_env(ENV_API_KEY).or_else(|| non_empty_env(ENV_GEMINI_API_KEY));
        if key.is_some() {
            self.api_key = key;
        }
        if let Some(value) = non_empty_env(ENV_BASE_URL) {
            self.base_url = value;
        }
        if let Some(value) = non_empty_env(ENV_FAST_MODEL) {
            self.models.fast_model = value;
        }
        if let Some(value) = non_empty_env(ENV_DEEP_MODEL) {
            self.models.deep_model = value;
        }
        if let Some(value) = non_empty_env(ENV_SPEECH_MODEL) {
            self.speech_model = value;
        }
        if let Some(value) = non_empty_env(ENV_VOICE) {
            self.voice = value;
        }
        if let Some(value) = non_empty_env(ENV_MIN_LATENCY_MS) {
            self.min_latency_ms = value.parse::<u64>().with_context(|| {
                format!("{ENV_MIN_LATENCY_MS} must be a whole number of milliseconds")
            })?;
        }
        if let Some(value) = non_empty_env(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = parse_seconds(ENV_REQUEST_TIMEOUT, &value)?;
        }
        if let Some(value) = non_empty_env(ENV_DEEP_REQUEST_TIMEOUT) {
            self.deep_request_timeout_secs = parse_seconds(ENV_DEEP_REQUEST_TIMEOUT, &value)?;
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.into(),
            models: ModelSelection::default(),
            speech_model: DEFAULT_SPEECH_MODEL.into(),
            voice: DEFAULT_VOICE.into(),
            min_latency_ms: DEFAULT_MIN_LATENCY_MS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            deep_request_timeout_secs: DEFAULT_DEEP_REQUEST_TIMEOUT_SECS,
            settings: UserSettings::default(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_seconds(name: &str, value: &str) -> Result<u64> {
    value.parse::<u64>().with_context(|| format!("{name} must be a whole number of seconds"))
}

fn config_file_override() -> Option<PathBuf> {
    let value = env::var_os(ENV_CONFIG_PATH)?;
    if value.is_empty() {
        return None;
    }
    let path = PathBuf::from(value);
    if path.is_dir() {
        return Some(path.join(CONFIG_FILE_NAME));
    }
    Some(path)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let partial: PartialConfig =
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(partial)
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    fast_model: Option<String>,
    deep_model: Option<String>,
    speech_model: Option<String>,
    voice: Option<String>,
    min_latency_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    deep_request_timeout_secs: Option<u64>,
    work_start: Option<String>,
    work_end: Option<String>,
    break_duration: Option<u32>,
}
