// src/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::feed::featured::DEFAULT_FEATURED_LIMIT;

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const ENV_API_BASE_URL: &str = "FEED_API_BASE_URL";

fn default_api_base_url() -> String {
    "http://localhost:8080/api".to_string()
}
fn default_page_size() -> u32 {
    10
}
fn default_featured_limit() -> usize {
    DEFAULT_FEATURED_LIMIT
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root of the blog REST API, without trailing slash.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_featured_limit")]
    pub featured_limit: usize,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Use the server's top-viewed endpoint for the featured list.
    #[serde(default = "default_true")]
    pub ranking_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            page_size: default_page_size(),
            featured_limit: default_featured_limit(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            ranking_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Load from an explicit path. Supports TOML or JSON, chosen by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg = match ext.as_str() {
            "toml" => toml::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("parsing {}", path.display()))?,
            other => bail!("unsupported feed config format: {other:?}"),
        };
        Ok(Self::sanitize(cfg))
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $FEED_CONFIG_PATH
    /// 2) config/feed.toml
    /// 3) config/feed.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let toml_p = PathBuf::from("config/feed.toml");
            let json_p = PathBuf::from("config/feed.json");
            if toml_p.exists() {
                Self::load_from(&toml_p)?
            } else if json_p.exists() {
                Self::load_from(&json_p)?
            } else {
                Self::default()
            }
        };

        if let Ok(url) = std::env::var(ENV_API_BASE_URL) {
            if !url.trim().is_empty() {
                cfg.api_base_url = url;
            }
        }
        Ok(Self::sanitize(cfg))
    }

    fn sanitize(mut cfg: Self) -> Self {
        cfg.api_base_url = cfg.api_base_url.trim().trim_end_matches('/').to_string();
        if cfg.api_base_url.is_empty() {
            cfg.api_base_url = default_api_base_url();
        }
        cfg.page_size = cfg.page_size.max(1);
        cfg.featured_limit = cfg.featured_limit.max(1);
        cfg
    }
}
