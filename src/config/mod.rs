use anyhow::{Context, Result};
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Base URL of the course-assistant backend.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Upper bound on how long one query may stay unanswered before it is
    /// treated as a transport failure.
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,

    /// Per-request HTTP timeout for course list, shutdown, and health calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Print a HH:MM timestamp next to each message.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Animate the typing indicator while a reply is pending.
    #[serde(default = "default_true")]
    pub typing_indicator: bool,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_reply_timeout_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            timestamps: true,
            typing_indicator: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            backend_url: default_backend_url(),
            reply_timeout_secs: default_reply_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let config_dir = home.join(".campusmate");
        let config_path = config_dir.join("config.toml");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir).context("Failed to create .campusmate directory")?;
        }

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Config {
                config_path: config_path.clone(),
                ..Config::default()
            };
            config.save()?;
            config
        };
        config.config_path = config_path;
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }

    /// Apply environment variable overrides to config
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("CAMPUSMATE_BACKEND_URL") {
            if !url.is_empty() {
                self.backend_url = url;
            }
        }
        if let Ok(secs) = std::env::var("CAMPUSMATE_REPLY_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                if secs > 0 {
                    self.reply_timeout_secs = secs;
                }
            }
        }
        if let Ok(secs) = std::env::var("CAMPUSMATE_REQUEST_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                if secs > 0 {
                    self.request_timeout_secs = secs;
                }
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        let parent_dir = self
            .config_path
            .parent()
            .context("Config path must have a parent directory")?;
        fs::create_dir_all(parent_dir).context("Failed to create config directory")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }

    pub fn reply_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reply_timeout_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
