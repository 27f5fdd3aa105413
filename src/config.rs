//! Layered configuration (SPEC_FULL §2's ambient "Configuration" component):
//! loads `lit-critic.toml` from the project root (the same file the repo
//! preflight uses as its sentinel marker, see `lc_facade::repo_preflight`),
//! falling back to built-in defaults for anything the file omits, then
//! layering a handful of environment variables documented in spec.md §6.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for one lit-critic project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelDefaultsConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDefaultsConfig {
    /// Short model name resolved by the registry (`sonnet`, `opus`, …).
    #[serde(default = "default_analysis_model")]
    pub analysis_model: String,
    /// Defaults to the analysis model when unset (§6's CLI surface).
    #[serde(default)]
    pub discussion_model: Option<String>,
    #[serde(default = "default_lens_preset")]
    pub lens_preset: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

/// Model-discovery knobs (§4.1, §6's environment variables). Discovery
/// itself lives in `lc_providers::registry`; this just carries the
/// config-file-layered defaults that seed it when the matching env var is
/// unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_discovery_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_discovery_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_analysis_model() -> String {
    "sonnet".to_string()
}
fn default_lens_preset() -> String {
    "balanced".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_discovery_ttl_seconds() -> u64 {
    3600
}
fn default_discovery_timeout_seconds() -> u64 {
    8
}

impl Default for Config {
    fn default() -> Self {
        Self { model: ModelDefaultsConfig::default(), discovery: DiscoveryConfig::default() }
    }
}

impl Default for ModelDefaultsConfig {
    fn default() -> Self {
        Self {
            analysis_model: default_analysis_model(),
            discussion_model: None,
            lens_preset: default_lens_preset(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: default_discovery_ttl_seconds(),
            timeout_seconds: default_discovery_timeout_seconds(),
            cache_path: None,
        }
    }
}

impl Config {
    /// Loads `lit-critic.toml` from `project_path`, falling back to
    /// defaults for any missing file or key. Environment variables take
    /// precedence over the file for the discovery knobs (§6).
    pub fn load(project_path: &Path) -> crate::error::Result<Self> {
        let marker = project_path.join(lc_facade::repo_preflight::MARKER_FILENAME);
        let mut config: Config = if marker.exists() {
            let raw = std::fs::read_to_string(&marker)?;
            toml::from_str(&raw)?
        } else {
            Config::default()
        };

        if let Ok(raw) = std::env::var("MODEL_DISCOVERY_ENABLED") {
            config.discovery.enabled = matches!(raw.as_str(), "1" | "true" | "yes");
        }
        if let Ok(raw) = std::env::var("MODEL_DISCOVERY_TTL_SECONDS") {
            if let Ok(v) = raw.parse() {
                config.discovery.ttl_seconds = v;
            }
        }
        if let Ok(raw) = std::env::var("MODEL_DISCOVERY_TIMEOUT_SECONDS") {
            if let Ok(v) = raw.parse() {
                config.discovery.timeout_seconds = v;
            }
        }
        if let Ok(raw) = std::env::var("MODEL_CACHE_PATH") {
            config.discovery.cache_path = Some(PathBuf::from(raw));
        }

        Ok(config)
    }
}
