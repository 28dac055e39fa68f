//! Configuration file schema for screenmap.
//!
//! Every field has a default, so an absent or empty `screenmap.yaml` is a
//! valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::flows::ClosureLimits;
use crate::provider::RetryPolicy;
use crate::screenshot::CaptureSettings;

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["screenmap.yaml", "screenmap.yml", ".screenmap.yaml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub limits: LimitsConfig,
    pub fetch: FetchConfig,
    pub capture: CaptureConfig,
    pub store: StoreConfig,
    /// Glob patterns for tree paths to ignore (e.g. "**/stories/**").
    pub excluded_paths: Vec<String>,
}

/// Extraction ceilings.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_import_depth: usize,
    pub max_files_per_screen: usize,
    /// Files fetched across a whole scan.
    pub max_files: usize,
    /// Larger files are skipped unfetched.
    pub max_file_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_import_depth: 3,
            max_files_per_screen: 25,
            max_files: 2000,
            max_file_bytes: 512 * 1024,
        }
    }
}

/// Tree and content fetching.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub concurrency: usize,
    pub github_api: String,
    pub github_raw: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 2,
            backoff_ms: 250,
            concurrency: 8,
            github_api: "https://api.github.com".to_string(),
            github_raw: "https://raw.githubusercontent.com".to_string(),
        }
    }
}

/// Screenshot service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub backoff_ms: u64,
    pub max_in_flight: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 30_000,
            max_retries: 2,
            backoff_ms: 500,
            max_in_flight: 4,
        }
    }
}

/// Record persistence.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory for stored records (default: platform data dir).
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Find a config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    pub fn closure_limits(&self) -> ClosureLimits {
        ClosureLimits {
            max_import_depth: self.limits.max_import_depth,
            max_files_per_screen: self.limits.max_files_per_screen,
        }
    }

    pub fn fetch_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: Duration::from_millis(self.fetch.timeout_ms),
            max_retries: self.fetch.max_retries,
            backoff: Duration::from_millis(self.fetch.backoff_ms),
        }
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            max_in_flight: self.capture.max_in_flight,
            retry: RetryPolicy {
                timeout: Duration::from_millis(self.capture.timeout_ms),
                max_retries: self.capture.max_retries,
                backoff: Duration::from_millis(self.capture.backoff_ms),
            },
        }
    }

    /// Compile `excluded_paths` into one matcher.
    pub fn excluded_matcher(&self) -> anyhow::Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
            builder.add(glob);
        }
        Ok(builder.build()?)
    }
}

/// Validate a config.
pub fn validate(config: &Config) -> anyhow::Result<()> {
    let limits = &config.limits;
    let zero = [
        ("limits.max_files_per_screen", limits.max_files_per_screen == 0),
        ("limits.max_files", limits.max_files == 0),
        ("limits.max_file_bytes", limits.max_file_bytes == 0),
        ("fetch.concurrency", config.fetch.concurrency == 0),
        ("fetch.timeout_ms", config.fetch.timeout_ms == 0),
        ("capture.max_in_flight", config.capture.max_in_flight == 0),
        ("capture.timeout_ms", config.capture.timeout_ms == 0),
    ];
    if let Some((field, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
        anyhow::bail!("{} must be greater than zero", field);
    }

    for (field, url) in [
        ("fetch.github_api", &config.fetch.github_api),
        ("fetch.github_raw", &config.fetch.github_raw),
    ] {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("{} must be an http(s) url, got {:?}", field, url);
        }
    }

    config.excluded_matcher()?;
    Ok(())
}
