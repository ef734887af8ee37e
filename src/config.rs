//! Configuration file handling.
//!
//! This module handles loading `.hookmon.toml` and merging it with
//! command-line arguments into the limits and client settings a run needs.

use crate::cli::Args;
use crate::error::ValidationError;
use crate::github::ClientOptions;
use crate::ordering::{SortOrder, SortSpec};
use crate::pipeline::Limits;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".hookmon.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// GitHub API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Worker pool sizes.
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    /// Output defaults.
    #[serde(default)]
    pub output: OutputConfig,
}

/// GitHub API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Deliveries requested per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Maximum delivery pages fetched per hook.
    #[serde(default = "default_max_delivery_pages")]
    pub max_delivery_pages: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            per_page: default_per_page(),
            max_delivery_pages: default_max_delivery_pages(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_per_page() -> u32 {
    100
}

fn default_max_delivery_pages() -> u32 {
    1
}

/// Worker pool sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Repositories scanned at once.
    #[serde(default = "default_discovery_workers")]
    pub discovery_workers: usize,

    /// Delivery details fetched at once.
    #[serde(default = "default_enrichment_workers")]
    pub enrichment_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            discovery_workers: default_discovery_workers(),
            enrichment_workers: default_enrichment_workers(),
        }
    }
}

fn default_discovery_workers() -> usize {
    10
}

fn default_enrichment_workers() -> usize {
    5
}

/// Output defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default sort, `field` or `field:order`. Overridden by `--sort`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// Print JSON instead of a table.
    #[serde(default)]
    pub json: bool,

    /// Disable table colors.
    #[serde(default)]
    pub no_color: bool,
}

impl OutputConfig {
    /// The configured default sort. Unknown fields fall back to newest
    /// first, an unknown order token to the field's default.
    pub fn sort_spec(&self) -> Option<SortSpec> {
        let raw = self.sort.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }

        let (field, order) = match raw.split_once(':') {
            Some((field, order)) => (field, SortOrder::from_token(order)),
            None => (raw, None),
        };
        let spec = SortSpec::resolve(field, order);
        if spec.field.to_string() != field {
            warn!("Unknown sort field '{}' in {}, using {}", field, CONFIG_FILE, spec);
        }
        Some(spec)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.clone();
        }
        if args.json {
            self.output.json = true;
        }
        if args.no_color {
            self.output.no_color = true;
        }
    }

    /// Pool sizes and paging for the pipeline.
    pub fn limits(&self) -> Result<Limits, ValidationError> {
        if self.concurrency.discovery_workers == 0 {
            return Err(ValidationError::ZeroWorkers("discovery"));
        }
        if self.concurrency.enrichment_workers == 0 {
            return Err(ValidationError::ZeroWorkers("enrichment"));
        }

        Ok(Limits {
            discovery_workers: self.concurrency.discovery_workers,
            enrichment_workers: self.concurrency.enrichment_workers,
            per_page: self.api.per_page,
        })
    }

    /// Settings for the GitHub client.
    pub fn client_options(&self, token: String) -> ClientOptions {
        ClientOptions {
            base_url: self.api.base_url.clone(),
            token,
            timeout_seconds: self.api.timeout_seconds,
            max_delivery_pages: self.api.max_delivery_pages,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
