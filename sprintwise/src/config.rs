//! Application configuration management.
//!
//! Configuration is loaded once at startup from an optional YAML file, then overridden by
//! environment variables. The file path defaults to `config.yaml` but can be specified via the
//! `-f` flag or the `SPRINTWISE_CONFIG` environment variable. A missing file is not an error: a
//! typical deployment only sets environment variables.
//!
//! ## Loading Priority
//!
//! Sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Prefixed environment variables** - `SPRINTWISE_` variables, nested with `__`
//!    (e.g. `SPRINTWISE_KIE__REQUEST_TIMEOUT=30s`)
//! 3. **Deployment environment variables** - the bare names used by the hosting environment:
//!
//! | Variable           | Field                      | Default                   |
//! |--------------------|----------------------------|---------------------------|
//! | `KIE_BASE_URL`     | `kie.base_url`             | `https://api.kie.ai`      |
//! | `KIE_API_KEY`      | `kie.api_key`              | unset (generation off)    |
//! | `KIE_MODEL`        | `kie.model`                | `nano-banana-pro`         |
//! | `CALENDAR_PROMPT`  | `kie.prompt`               | built-in calendar prompt  |
//! | `S3_BUCKET`        | `storage.bucket`           | unset (uploads off)       |
//! | `AWS_REGION`       | `storage.region`           | `us-east-2`               |
//! | `PUBLIC_FILE_BASE` | `storage.public_file_base` | unset                     |
//!
//! An unset API key or bucket is not a startup error. The corresponding endpoints answer with a
//! 500 until the deployment is fixed, see [`KieConfig::require_api_key`] and
//! [`StorageConfig::require_bucket`].

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;

/// Deployment variables and the config paths they override.
const DEPLOYMENT_ENV: &[(&str, &str)] = &[
    ("KIE_BASE_URL", "kie.base_url"),
    ("KIE_API_KEY", "kie.api_key"),
    ("KIE_MODEL", "kie.model"),
    ("CALENDAR_PROMPT", "kie.prompt"),
    ("S3_BUCKET", "storage.bucket"),
    ("AWS_REGION", "storage.region"),
    ("PUBLIC_FILE_BASE", "storage.public_file_base"),
];

/// Prompt sent with every generation task unless `CALENDAR_PROMPT` overrides it.
pub const DEFAULT_CALENDAR_PROMPT: &str = r#"You have two input images:
1. USER IMAGE: A photo of the person (can be a selfie or portrait)
2. REFERENCE CALENDAR: A themed calendar/planner template (e.g., beige planner with cartoon character, icons, layout)

TASK:
Create an output image that is an EXACT REPLICA of the reference calendar, with ONE change: replace ALL human or cartoon characters in the reference with a cartoon/stylized version of the person from the user image.

REPLICATION RULES:
- Copy the reference calendar layout EXACTLY: same structure, same positions, same proportions
- Preserve the 30-day grid: same number of cells, same arrangement (e.g., 6×5 or 5×6)
- Keep all 30 cells EMPTY—no text, numbers, or goals inside any cell
- Preserve the theme: colors, line style, background, decorative elements (icons, borders, labels)
- Preserve the exact pixel layout so the output can be overlaid with text at fixed coordinates

CHARACTER REPLACEMENT:
- Identify every human/cartoon character in the reference (e.g., person peeking over "Goals", avatar in corner)
- Replace each with a cartoon/stylized version of the person from the user image
- Match the reference's cartoon style (e.g., same line weight, same level of detail)
- Keep the character's pose, position, and size the same as in the reference
- Preserve clothing style/colors from the user image where possible
- Keep only single character, the user in the same style

CONSISTENCY:
- Output must have the same dimensions and layout as the reference
- The 30-day grid must remain in the same position with the same cell sizes
- Only the character(s) change—everything else is an exact copy

Purpose: The output will be used as a base. Goals will be added programmatically at fixed pixel positions. Layout must be predictable and identical across generations."#;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SPRINTWISE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// Immutable once loaded; handlers and adapters receive it (or the section they need) explicitly.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
    /// Image generation provider settings
    pub kie: KieConfig,
    /// Object storage settings for uploads
    pub storage: StorageConfig,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests
    pub allowed_origins: Vec<CorsOrigin>,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

/// CORS origin specification.
///
/// Can be either a wildcard (`*`) to allow all origins, or a specific URL.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CorsOrigin {
    /// Allow all origins (`*`)
    #[serde(deserialize_with = "parse_wildcard")]
    Wildcard,
    /// Specific origin URL (e.g., `https://app.example.com`)
    #[serde(deserialize_with = "parse_url")]
    Url(Url),
}

fn parse_wildcard<'de, D>(deserializer: D) -> Result<(), D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    if s == "*" {
        Ok(())
    } else {
        Err(serde::de::Error::custom("Expected '*'"))
    }
}

fn parse_url<'de, D>(deserializer: D) -> Result<Url, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Url::parse(&s).map_err(serde::de::Error::custom)
}

/// Connection settings for the kie.ai job API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct KieConfig {
    /// Base URL of the provider (paths such as `/api/v1/jobs/createTask` are appended)
    pub base_url: Url,
    /// Bearer token. Generation endpoints are disabled while unset.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Model identifier sent with every task
    pub model: String,
    /// Full prompt text sent with every task
    pub prompt: String,
    /// Timeout for a single call to the provider
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl KieConfig {
    /// Returns the API key, or a configuration error if the deployment didn't provide one.
    pub fn require_api_key(&self) -> Result<&str, Error> {
        self.api_key.as_deref().ok_or(Error::Configuration { setting: "KIE_API_KEY" })
    }
}

/// Object storage (S3) settings for uploaded images.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Target bucket. Uploads are disabled while unset.
    pub bucket: Option<String>,
    /// AWS region of the bucket
    pub region: String,
    /// Public base URL (e.g. a CDN) used instead of the bucket URL when building file URLs
    pub public_file_base: Option<String>,
    /// Prefix every object key is namespaced under
    pub key_prefix: String,
    /// Directory uploads are buffered in before being sent (default: OS temp dir)
    pub temp_dir: Option<PathBuf>,
    /// Custom S3-compatible endpoint (MinIO, localstack)
    pub endpoint_url: Option<String>,
    /// Maximum accepted request body for `/upload`, in bytes
    pub max_upload_size: usize,
}

impl StorageConfig {
    /// Returns the bucket name, or a configuration error if the deployment didn't provide one.
    pub fn require_bucket(&self) -> Result<&str, Error> {
        self.bucket.as_deref().ok_or(Error::Configuration { setting: "S3_BUCKET" })
    }

    /// Directory where uploads are buffered on local disk.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_otel_export: false,
            cors: CorsConfig::default(),
            kie: KieConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![CorsOrigin::Wildcard],
            max_age: Some(3600), // Cache preflight for 1 hour
        }
    }
}

impl Default for KieConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.kie.ai").expect("default KIE base URL is valid"),
            api_key: None,
            model: "nano-banana-pro".to_string(),
            prompt: DEFAULT_CALENDAR_PROMPT.to_string(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            region: "us-east-2".to_string(),
            public_file_base: None,
            key_prefix: "uploads".to_string(),
            temp_dir: None,
            endpoint_url: None,
            max_upload_size: 25 * 1024 * 1024, // 25 MiB
        }
    }
}

/// Treats an empty (or whitespace only) value as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        config.kie.api_key = non_empty(config.kie.api_key.take());
        config.storage.bucket = non_empty(config.storage.bucket.take());
        config.storage.public_file_base = non_empty(config.storage.public_file_base.take());
        config.storage.endpoint_url = non_empty(config.storage.endpoint_url.take());

        config.validate().map_err(figment::Error::from)?;
        Ok(config)
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.kie.request_timeout.is_zero() {
            return Err("Config validation: kie.request_timeout must be greater than zero".to_string());
        }

        if self.kie.model.trim().is_empty() {
            return Err("Config validation: kie.model cannot be empty".to_string());
        }

        if self.storage.max_upload_size == 0 {
            return Err("Config validation: storage.max_upload_size must be greater than zero".to_string());
        }

        if self.storage.key_prefix.trim_matches('/').is_empty() {
            return Err("Config validation: storage.key_prefix cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        let mut figment = Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Prefixed variables for any field, nested with `__`
            .merge(Env::prefixed("SPRINTWISE_").ignore(&["config"]).split("__"));

        // Deployment variables are taken verbatim so keys and prompts are never reinterpreted
        // as numbers or arrays.
        for &(var, key) in DEPLOYMENT_ENV {
            if let Ok(value) = std::env::var(var) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }

        figment
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
