//! Configuration management for vidacquire using the prefer crate.
//!
//! A config file (discovered by prefer, or passed with `--config`) is merged
//! with environment overrides into an immutable [`Settings`] value.

mod browser;

pub use browser::{BrowserEngineConfig, LoginConfig, ResolverConfig};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::scrapers::{ListingSelectors, LoginCredentials};
use crate::storage::CollisionPolicy;

/// Default number of concurrent download units.
pub const DEFAULT_CONCURRENCY: usize = 5;
/// Default wait after advancing to the next listing page.
pub const DEFAULT_SETTLE_SECS: u64 = 10;
/// Default bound on a single link resolution.
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 60;
/// Default session slot, relative to the working directory.
pub const DEFAULT_SESSION_FILE: &str = "cookies.json";
/// Default output directory.
pub const DEFAULT_OUTPUT_PATH: &str = "downloads";

/// Session persistence options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Re-authenticate when a persisted cookie has expired.
    #[serde(default)]
    pub check_expiry: bool,
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory downloads and `log.csv` are written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Path of the persisted session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    /// Seconds to wait after clicking the next-page control.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolve_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collision: Option<CollisionPolicy>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub listing: ListingSelectors,
    #[serde(default)]
    pub login: LoginConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Falls back to defaults when no vidacquire config file is found.
    pub async fn load() -> Self {
        match prefer::load("vidacquire").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// TOML for `.toml` files, JSON otherwise.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved against `base_dir`
    pub fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Resolve into settings, applying `USERNAME`, `PASSWORD` and `OUTPUT_PATH`.
    pub fn into_settings(self) -> Settings {
        self.into_settings_with_env(&EnvOverrides::from_env())
    }

    fn into_settings_with_env(self, env: &EnvOverrides) -> Settings {
        let cwd = PathBuf::from(".");
        let base_dir = self.base_dir().unwrap_or_else(|| cwd.clone());

        // OUTPUT_PATH is relative to the working directory, file values to the file.
        let output_path = match (&env.output_path, &self.output_path) {
            (Some(env_path), _) => Self::resolve_path(env_path, &cwd),
            (None, Some(path)) => Self::resolve_path(path, &base_dir),
            (None, None) => PathBuf::from(DEFAULT_OUTPUT_PATH),
        };
        let session_file = self
            .session_file
            .as_deref()
            .map(|p| Self::resolve_path(p, &base_dir))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

        Settings {
            output_path,
            session_file,
            username: env.username.clone(),
            password: env.password.clone(),
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
            settle: Duration::from_secs(self.settle_secs.unwrap_or(DEFAULT_SETTLE_SECS)),
            resolve_timeout: Duration::from_secs(
                self.resolve_timeout_secs
                    .unwrap_or(DEFAULT_RESOLVE_TIMEOUT_SECS),
            ),
            collision: self.collision.unwrap_or_default(),
            check_expiry: self.session.check_expiry,
            listing: self.listing,
            login: self.login,
            resolver: self.resolver,
            browser: self.browser,
        }
    }
}

/// Values read from the process environment (after `.env` is loaded).
#[derive(Debug, Clone, Default)]
struct EnvOverrides {
    username: Option<String>,
    password: Option<String>,
    output_path: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            username: var("USERNAME"),
            password: var("PASSWORD"),
            output_path: var("OUTPUT_PATH"),
        }
    }
}

/// Resolved, immutable run settings.
#[derive(Clone)]
pub struct Settings {
    pub output_path: PathBuf,
    pub session_file: PathBuf,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Upper bound on concurrently admitted download units (at least 1).
    pub concurrency: usize,
    pub settle: Duration,
    pub resolve_timeout: Duration,
    pub collision: CollisionPolicy,
    pub check_expiry: bool,
    pub listing: ListingSelectors,
    pub login: LoginConfig,
    pub resolver: ResolverConfig,
    pub browser: BrowserEngineConfig,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("output_path", &self.output_path)
            .field("session_file", &self.session_file)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("concurrency", &self.concurrency)
            .field("settle", &self.settle)
            .field("resolve_timeout", &self.resolve_timeout)
            .field("collision", &self.collision)
            .field("check_expiry", &self.check_expiry)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Config::default().into_settings_with_env(&EnvOverrides::default())
    }
}

impl Settings {
    /// Path of the metadata log.
    pub fn metadata_log_path(&self) -> PathBuf {
        self.output_path.join(crate::metadata_log::LOG_FILENAME)
    }

    /// Login inputs, required only when a session must be created.
    ///
    /// The login page defaults to `fallback_url` (usually the listing start URL)
    /// when the config does not name one.
    pub fn credentials(&self, fallback_url: &str) -> Result<LoginCredentials, PipelineError> {
        match (&self.username, &self.password) {
            (Some(email), Some(password)) => Ok(LoginCredentials {
                login_url: self
                    .login
                    .url
                    .clone()
                    .unwrap_or_else(|| fallback_url.to_string()),
                email: email.clone(),
                password: password.clone(),
            }),
            _ => Err(PipelineError::MissingCredentials),
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (--config flag).
    pub config_path: Option<PathBuf>,
    /// Output directory override (--output flag), wins over everything else.
    pub output_path: Option<PathBuf>,
}

/// Load settings: explicit config file, else prefer discovery, then env overrides.
pub async fn load_settings(options: LoadOptions) -> anyhow::Result<Settings> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path)
            .await
            .map_err(anyhow::Error::msg)?,
        None => Config::load().await,
    };

    let mut settings = config.into_settings();
    if let Some(output) = options.output_path {
        settings.output_path = output;
    }
    Ok(settings)
}
