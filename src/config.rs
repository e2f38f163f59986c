use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub drafts: DraftsConfig,
    pub submission: SubmissionConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub rest_api: RestApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote marketplace backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the marketplace backend (no trailing slash)
    pub base_url: String,
    /// Optional timeout for outbound calls; unset means wait indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftsConfig {
    /// Maximum number of images attached to a post (default: 5)
    #[serde(default = "default_max_images")]
    pub max_images: usize,
    /// Seconds the "latest post" preview stays readable (default: 300)
    #[serde(default = "default_preview_ttl")]
    pub preview_ttl_secs: u64,
}

fn default_max_images() -> usize {
    5
}

fn default_preview_ttl() -> u64 {
    300 // 5 minutes
}

impl Default for DraftsConfig {
    fn default() -> Self {
        Self {
            max_images: default_max_images(),
            preview_ttl_secs: default_preview_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Seconds before the success screen redirects home (default: 5)
    #[serde(default = "default_countdown")]
    pub redirect_countdown_secs: u64,
    /// Route of the success view
    #[serde(default = "default_success_path")]
    pub success_path: String,
    /// Route the countdown redirects to
    #[serde(default = "default_home_path")]
    pub home_path: String,
}

fn default_countdown() -> u64 {
    5
}

fn default_success_path() -> String {
    "/post/success".to_string()
}

fn default_home_path() -> String {
    "/".to_string()
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            redirect_countdown_secs: default_countdown(),
            success_path: default_success_path(),
            home_path: default_home_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub state: String,
}

/// Lightweight session hints forwarded with submissions when present
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionConfig {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestApiConfig {
    /// Port for `swapboard serve` (default: 7010)
    #[serde(default = "default_rest_port")]
    pub port: u16,
}

fn default_rest_port() -> u16 {
    7010
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            port: default_rest_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether `serve` logs to a file (false = stderr)
    #[serde(default = "default_log_to_file")]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_to_file() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: default_log_to_file(),
        }
    }
}

impl Config {
    /// Path to the project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from(".swapboard/config.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so swapboard works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // User config in ~/.config/swapboard/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("swapboard").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with SWAPBOARD_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("SWAPBOARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    /// Write the config as TOML to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Get absolute path to state directory
    pub fn state_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.paths.state);
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir().unwrap_or_default().join(path)
        }
    }

    /// Directory holding persisted drafts and the latest-post preview
    pub fn drafts_path(&self) -> PathBuf {
        self.state_path().join("drafts")
    }

    /// Get absolute path to logs directory
    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "https://liwedoc.vercel.app".to_string(),
                request_timeout_secs: None,
            },
            drafts: DraftsConfig::default(),
            submission: SubmissionConfig::default(),
            paths: PathsConfig {
                state: ".swapboard".to_string(), // Relative to cwd
            },
            session: SessionConfig::default(),
            rest_api: RestApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
