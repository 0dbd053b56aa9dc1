use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tags: TagsConfig,
}

/// Where episodes are listed and fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Listing page scanned for episode links.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    /// Base URL tried once per episode after the primary host refuses the
    /// connection. The episode filename is appended to it.
    #[serde(default = "default_mirror_base")]
    pub mirror_base: String,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Optional connect deadline. Unset means the HTTP client's own
    /// default applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
}

/// User-configurable paths for downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of the `<year>/<filename>` tree.
    /// Defaults to `~/teishos`.
    #[serde(default = "platform::default_target_dir")]
    pub target_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagsConfig {
    #[serde(default = "default_album_artist")]
    pub album_artist: String,
    #[serde(default = "default_album_prefix")]
    pub album_prefix: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            listing_url: default_listing_url(),
            mirror_base: default_mirror_base(),
            max_redirects: default_max_redirects(),
            connect_timeout_secs: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            target_dir: platform::default_target_dir(),
        }
    }
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            album_artist: default_album_artist(),
            album_prefix: default_album_prefix(),
        }
    }
}

fn default_listing_url() -> String {
    "http://rzcpodcasts.blogspot.com/search?max-results=10000".to_string()
}

fn default_mirror_base() -> String {
    "https://s3-us-west-1.amazonaws.com/rzc/podcasts".to_string()
}

fn default_max_redirects() -> usize {
    10
}

fn default_album_artist() -> String {
    "Rochester Zen Center".to_string()
}

fn default_album_prefix() -> String {
    "Teishos".to_string()
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
