//! # Configuration
//!
//! Store settings live in `<root>/config.json`. Every key is optional; missing
//! keys take the compiled defaults below, so an absent file is a valid config.
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `mirror_root` | unset | Secondary root receiving best-effort replicas |
//! | `renderer` | unset | Cover renderer program; unset disables generation |
//! | `renderer_args` | `["--max-width", "640"]` | Extra arguments after `<src> <dest>` |
//! | `cover_concurrency` | `2` | Max renderer processes running at once |
//! | `render_timeout_secs` | `25` | Wall-clock limit per renderer run |
//! | `failure_backoff_secs` | `600` | Cool-down after a failed render |
//! | `max_upload_bytes` | `52428800` | Largest accepted content file |
//! | `default_cover` | unset | Image served when no real cover exists |

use crate::error::{PaperError, Result};
use crate::store::atomic::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILENAME: &str = "config.json";

fn default_renderer_args() -> Vec<String> {
    vec!["--max-width".to_string(), "640".to_string()]
}

fn default_cover_concurrency() -> usize {
    2
}

fn default_render_timeout_secs() -> u64 {
    25
}

fn default_failure_backoff_secs() -> u64 {
    10 * 60
}

fn default_max_upload_bytes() -> u64 {
    50 * 1024 * 1024
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renderer: Option<PathBuf>,

    #[serde(default = "default_renderer_args")]
    pub renderer_args: Vec<String>,

    #[serde(default = "default_cover_concurrency")]
    pub cover_concurrency: usize,

    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    #[serde(default = "default_failure_backoff_secs")]
    pub failure_backoff_secs: u64,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_cover: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mirror_root: None,
            renderer: None,
            renderer_args: default_renderer_args(),
            cover_concurrency: default_cover_concurrency(),
            render_timeout_secs: default_render_timeout_secs(),
            failure_backoff_secs: default_failure_backoff_secs(),
            max_upload_bytes: default_max_upload_bytes(),
            default_cover: None,
        }
    }
}

/// Keys accepted by [`StoreConfig::get`] and [`StoreConfig::set`].
pub const KEYS: &[&str] = &[
    "mirror_root",
    "renderer",
    "renderer_args",
    "cover_concurrency",
    "render_timeout_secs",
    "failure_backoff_secs",
    "max_upload_bytes",
    "default_cover",
];

impl StoreConfig {
    /// Load config from the given store root, or return defaults if not found.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self> {
        let config_path = root.as_ref().join(CONFIG_FILENAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&config_path)?;
        let config: StoreConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save config into the given store root.
    pub async fn save<P: AsRef<Path>>(&self, root: P) -> Result<()> {
        let root = root.as_ref();
        tokio::fs::create_dir_all(root).await?;
        let content = serde_json::to_vec_pretty(self)?;
        write_atomic(&root.join(CONFIG_FILENAME), &content).await?;
        Ok(())
    }

    /// Concurrency bound, never below one.
    pub fn cover_concurrency(&self) -> usize {
        self.cover_concurrency.max(1)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }

    pub fn failure_backoff(&self) -> Duration {
        Duration::from_secs(self.failure_backoff_secs)
    }

    /// Render a single key's value for display. Unset values print as empty.
    pub fn get(&self, key: &str) -> Result<String> {
        let value = match key {
            "mirror_root" => display_path(&self.mirror_root),
            "renderer" => display_path(&self.renderer),
            "renderer_args" => self.renderer_args.join(" "),
            "cover_concurrency" => self.cover_concurrency.to_string(),
            "render_timeout_secs" => self.render_timeout_secs.to_string(),
            "failure_backoff_secs" => self.failure_backoff_secs.to_string(),
            "max_upload_bytes" => self.max_upload_bytes.to_string(),
            "default_cover" => display_path(&self.default_cover),
            other => return Err(unknown_key(other)),
        };
        Ok(value)
    }

    /// Set a key from its textual form. An empty value clears optional keys.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "mirror_root" => self.mirror_root = parse_path(value),
            "renderer" => self.renderer = parse_path(value),
            "renderer_args" => {
                self.renderer_args = value.split_whitespace().map(str::to_string).collect()
            }
            "cover_concurrency" => self.cover_concurrency = parse_number(key, value)?,
            "render_timeout_secs" => self.render_timeout_secs = parse_number(key, value)?,
            "failure_backoff_secs" => self.failure_backoff_secs = parse_number(key, value)?,
            "max_upload_bytes" => self.max_upload_bytes = parse_number(key, value)?,
            "default_cover" => self.default_cover = parse_path(value),
            other => return Err(unknown_key(other)),
        }
        Ok(())
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn parse_path(value: &str) -> Option<PathBuf> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PaperError::Store(format!("{} expects a number, got '{}'", key, value)))
}

fn unknown_key(key: &str) -> PaperError {
    PaperError::Store(format!(
        "Unknown config key: {} (expected one of: {})",
        key,
        KEYS.join(", ")
    ))
}
