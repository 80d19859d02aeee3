use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scope::WORLDWIDE;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scope: ScopeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// CSV survey export: a local path or an http(s) URL.
    pub dataset: String,
    /// Country boundaries GeoJSON. Viewport fitting is skipped without it.
    pub boundaries: Option<String>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    #[serde(default = "default_click_tolerance")]
    pub click_tolerance_deg: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScopeConfig {
    #[serde(default = "default_worldwide_label")]
    pub worldwide_label: String,
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_click_tolerance() -> f64 {
    0.05
}

fn default_worldwide_label() -> String {
    WORLDWIDE.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            click_tolerance_deg: default_click_tolerance(),
        }
    }
}

impl Default for ScopeConfig {
    fn default() -> Self {
        ScopeConfig {
            worldwide_label: default_worldwide_label(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
