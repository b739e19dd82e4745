use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::directory;
use crate::photos;

const DEFAULT_ENV_PREFIX: &str = "ROLODEX";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryConfig {
    #[serde(default = "default_directory_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_result_count")]
    pub result_count: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            base_url: default_directory_base_url(),
            user_agent: default_user_agent(),
            result_count: default_result_count(),
            page_size: default_page_size(),
        }
    }
}

fn default_directory_base_url() -> String {
    directory::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    "rolodex/0.1 (+https://github.com/danielmerja/rolodex)".to_string()
}

fn default_result_count() -> usize {
    directory::DEFAULT_RESULT_COUNT
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GalleryConfig {
    #[serde(default = "default_gallery_base_url")]
    pub base_url: String,
    #[serde(default = "default_gallery_size")]
    pub size: usize,
    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
    #[serde(default = "default_viewport_width")]
    pub default_viewport_width: u32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            base_url: default_gallery_base_url(),
            size: default_gallery_size(),
            refresh_interval: default_refresh_interval(),
            default_viewport_width: default_viewport_width(),
        }
    }
}

fn default_gallery_base_url() -> String {
    photos::DEFAULT_BASE_URL.to_string()
}

fn default_gallery_size() -> usize {
    9
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_viewport_width() -> u32 {
    1280
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
    cfg = merge_config(cfg, load_env(prefix)?);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

fn merge_config(mut base: Config, other: Config) -> Config {
    if !other.directory.base_url.is_empty() {
        base.directory.base_url = other.directory.base_url;
    }
    if !other.directory.user_agent.is_empty() {
        base.directory.user_agent = other.directory.user_agent;
    }
    if other.directory.result_count != 0 {
        base.directory.result_count = other.directory.result_count;
    }
    if other.directory.page_size != 0 {
        base.directory.page_size = other.directory.page_size;
    }

    if !other.gallery.base_url.is_empty() {
        base.gallery.base_url = other.gallery.base_url;
    }
    if other.gallery.size != 0 {
        base.gallery.size = other.gallery.size;
    }
    base.gallery.refresh_interval = other.gallery.refresh_interval;
    if other.gallery.default_viewport_width != 0 {
        base.gallery.default_viewport_width = other.gallery.default_viewport_width;
    }

    base
}

fn load_env(prefix: &str) -> Result<Config> {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    if map.is_empty() {
        return Ok(Config::default());
    }

    let mut cfg = Config::default();

    for (key, value) in map {
        apply_env_value(&mut cfg, &key, value);
    }

    Ok(cfg)
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "directory.base_url" => cfg.directory.base_url = value,
        "directory.user_agent" => cfg.directory.user_agent = value,
        "directory.result_count" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.directory.result_count = parsed;
            }
        }
        "directory.page_size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.directory.page_size = parsed;
            }
        }
        "gallery.base_url" => cfg.gallery.base_url = value,
        "gallery.size" => {
            if let Ok(parsed) = value.parse::<usize>() {
                cfg.gallery.size = parsed;
            }
        }
        "gallery.refresh_interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.gallery.refresh_interval = duration;
            }
        }
        "gallery.default_viewport_width" => {
            if let Ok(parsed) = value.parse::<u32>() {
                cfg.gallery.default_viewport_width = parsed;
            }
        }
        _ => {}
    }
}

pub fn default_path() -> Option<PathBuf> {
    default_config_path()
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("rolodex").join("config.yaml"))
}
