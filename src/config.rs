use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::apod::{APOD_API_BASE, DEMO_API_KEY};

const DEFAULT_ENV_PREFIX: &str = "APOD_GALLERY";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key")]
    pub key: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            key: default_api_key(),
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    APOD_API_BASE.to_string()
}

fn default_api_key() -> String {
    DEMO_API_KEY.to_string()
}

fn default_user_agent() -> String {
    format!("apod-gallery/{}", crate::VERSION)
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryConfig {
    #[serde(default = "default_days")]
    pub default_days: u32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            default_days: default_days(),
        }
    }
}

fn default_days() -> u32 {
    9
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    for (key, value) in load_env(prefix) {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Overlays every field of `other` that differs from its default onto `base`.
fn merge_config(mut base: Config, other: Config) -> Config {
    let defaults = Config::default();

    if !other.api.base_url.trim().is_empty() && other.api.base_url != defaults.api.base_url {
        base.api.base_url = other.api.base_url;
    }
    if !other.api.key.trim().is_empty() && other.api.key != defaults.api.key {
        base.api.key = other.api.key;
    }
    if !other.api.user_agent.trim().is_empty() && other.api.user_agent != defaults.api.user_agent
    {
        base.api.user_agent = other.api.user_agent;
    }
    if !other.api.timeout.is_zero() && other.api.timeout != defaults.api.timeout {
        base.api.timeout = other.api.timeout;
    }

    if other.gallery.default_days != 0 && other.gallery.default_days != defaults.gallery.default_days
    {
        base.gallery.default_days = other.gallery.default_days;
    }

    if !other.log.level.trim().is_empty() && other.log.level != defaults.log.level {
        base.log.level = other.log.level;
    }
    if other.log.file.is_some() {
        base.log.file = other.log.file;
    }

    base
}

/// Variables under `prefix`, keyed by dotted config path (`log.level`).
fn load_env(prefix: &str) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }
    map
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    if value.trim().is_empty() {
        return;
    }
    match key {
        "api.base_url" => cfg.api.base_url = value,
        "api.key" => cfg.api.key = value,
        "api.user_agent" => cfg.api.user_agent = value,
        "api.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.api.timeout = duration;
            }
        }
        "gallery.default_days" => {
            if let Ok(parsed) = value.trim().parse::<u32>() {
                cfg.gallery.default_days = parsed;
            }
        }
        "log.level" => cfg.log.level = value,
        "log.file" => cfg.log.file = Some(PathBuf::from(value)),
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("apod-gallery").join("config.yaml"))
}
