use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fetch::retry::RetryPolicy;

const ENV_PREFIX: &str = "BORY";
/// INI section holding the settings.
const SECTION: &str = "bory";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppConfig {
    pub dundam_base_url: String,
    /// Character page URL with a `{name}` placeholder.
    pub url_template: String,
    /// Seconds.
    pub request_timeout: f64,
    pub request_max_retries: u32,
    /// Seconds; doubled on every retry.
    pub request_retry_backoff: f64,
    pub ocr_language: String,
    pub max_party_members: usize,
    pub fetch_concurrency: usize,
    pub log_level: String,
    pub config_path_used: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let base = "https://dundam.xyz";
        AppConfig {
            dundam_base_url: base.to_string(),
            url_template: default_template(base),
            request_timeout: 5.0,
            request_max_retries: 2,
            request_retry_backoff: 0.5,
            ocr_language: "ko".to_string(),
            max_party_members: 12,
            fetch_concurrency: 4,
            log_level: "info".to_string(),
            config_path_used: None,
        }
    }
}

impl AppConfig {
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        Ok(RetryPolicy {
            timeout: seconds("request_timeout", self.request_timeout)?,
            max_retries: self.request_max_retries,
            backoff_base: seconds("request_retry_backoff", self.request_retry_backoff)?,
        })
    }
}

fn default_template(base: &str) -> String {
    format!("{}/character?server=hilder&key={{name}}", base.trim_end_matches('/'))
}

fn seconds(key: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .with_context(|| format!("{} must be a non-negative number of seconds, got {}", key, value))
}

/// `config.ini` in the working directory, then `~/.bory.ini`.
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config.ini")];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".bory.ini"));
    }
    paths
}

/// Resolve config from the process environment and the first existing INI file.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let paths = match explicit {
        Some(p) => vec![p.to_path_buf()],
        None => default_paths(),
    };
    load_from(&paths, None)
}

/// Priority: `BORY_*` environment > `[bory]` section of the first existing file > defaults.
/// `environ` replaces the process environment when given.
pub fn load_from(paths: &[PathBuf], environ: Option<Map<String, String>>) -> Result<AppConfig> {
    let used = paths.iter().find(|p| p.is_file()).cloned();

    let mut builder = Config::builder();
    if let Some(ref path) = used {
        builder = builder.add_source(File::from(path.as_path()).format(FileFormat::Ini));
    }
    let settings = builder
        .add_source(Environment::with_prefix(ENV_PREFIX).source(environ))
        .build()
        .context("Failed to build configuration")?;

    let defaults = AppConfig::default();
    let dundam_base_url: String = resolve(&settings, "dundam_base_url", defaults.dundam_base_url)?;
    let url_template = resolve(&settings, "url_template", default_template(&dundam_base_url))?;

    let cfg = AppConfig {
        url_template,
        request_timeout: resolve(&settings, "request_timeout", defaults.request_timeout)?,
        request_max_retries: resolve(&settings, "request_max_retries", defaults.request_max_retries)?,
        request_retry_backoff: resolve(&settings, "request_retry_backoff", defaults.request_retry_backoff)?,
        ocr_language: resolve(&settings, "ocr_language", defaults.ocr_language)?,
        max_party_members: resolve(&settings, "max_party_members", defaults.max_party_members)?,
        fetch_concurrency: resolve(&settings, "fetch_concurrency", defaults.fetch_concurrency)?,
        log_level: resolve(&settings, "log_level", defaults.log_level)?,
        dundam_base_url,
        config_path_used: used,
    };
    validate(&cfg)?;
    Ok(cfg)
}

/// Environment keys land at the top level, file keys under `[bory]`.
fn resolve<T: DeserializeOwned>(settings: &Config, key: &str, default: T) -> Result<T> {
    for candidate in [key.to_string(), format!("{}.{}", SECTION, key)] {
        match settings.get::<T>(&candidate) {
            Ok(v) => return Ok(v),
            Err(ConfigError::NotFound(_)) => continue,
            Err(e) => return Err(e).with_context(|| format!("Invalid value for {}", key)),
        }
    }
    Ok(default)
}

fn validate(cfg: &AppConfig) -> Result<()> {
    cfg.retry_policy()?;
    if !cfg.url_template.contains("{name}") {
        bail!("url_template must contain a {{name}} placeholder: {}", cfg.url_template);
    }
    if cfg.fetch_concurrency == 0 {
        bail!("fetch_concurrency must be at least 1");
    }
    Ok(())
}
