// crates/veritrust-config/src/config.rs
// ============================================================================
// Module: Veritrust Configuration
// Description: Configuration loading and validation for Veritrust.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: veritrust-core, veritrust-auth, veritrust-pipeline,
//               veritrust-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: the signing secret has no
//! default, the debug identity override is refused unless explicitly allowed,
//! and webhook client seeds must be unambiguous before the platform starts.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use veritrust_auth::DebugActorRef;
use veritrust_auth::TokenCodec;
use veritrust_core::WebhookClient;
use veritrust_core::core::identifiers::QueueName;
use veritrust_core::core::identifiers::WebhookClientId;
use veritrust_pipeline::QueueTopology;
use veritrust_pipeline::RetryPolicy;
use veritrust_store_sqlite::SqliteJournalMode;
use veritrust_store_sqlite::SqliteStoreConfig;
use veritrust_store_sqlite::SqliteSyncMode;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "veritrust.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "VERITRUST_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Minimum token signing secret length in bytes.
pub(crate) const MIN_SECRET_LENGTH: usize = 32;
/// Minimum webhook client secret length in bytes.
pub(crate) const MIN_CLIENT_SECRET_LENGTH: usize = 16;
/// Maximum token lifetime in minutes.
pub(crate) const MAX_TOKEN_TTL_MINUTES: i64 = 24 * 60;
/// Maximum refresh lifetime in minutes.
pub(crate) const MAX_REFRESH_TTL_MINUTES: i64 = 30 * 24 * 60;
/// Default access token lifetime in minutes.
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;
/// Default refresh token lifetime in minutes.
const DEFAULT_REFRESH_TTL_MINUTES: i64 = 7 * 24 * 60;
/// Maximum retry backoff base or step in seconds.
pub(crate) const MAX_BACKOFF_SECONDS: u64 = 3600;
/// Maximum number of summary retries.
pub(crate) const MAX_RETRIES: u32 = 20;
/// Default database filename under the storage root.
const DEFAULT_DATABASE_NAME: &str = "veritrust.db";
/// Default retry base delay in seconds.
const DEFAULT_RETRY_BASE_SECONDS: u64 = 15;
/// Default retry step delay in seconds.
const DEFAULT_RETRY_STEP_SECONDS: u64 = 90;
/// Default retry cap.
const DEFAULT_MAX_RETRIES: u32 = 5;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Veritrust platform configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VeritrustConfig {
    /// Token issuance and identity resolution configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Queue name overrides for the task pipeline.
    #[serde(default)]
    pub queues: QueueConfig,
    /// Summary polling retry configuration.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Blob and database storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Registered webhook client seeds.
    #[serde(default)]
    pub webhooks: WebhooksConfig,
}

impl VeritrustConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;
        self.queues.validate()?;
        self.retry.validate()?;
        self.storage.validate()?;
        self.webhooks.validate()?;
        Ok(())
    }
}

/// Token issuance and identity resolution configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared token signing secret. Required; has no default.
    #[serde(default)]
    pub secret: String,
    /// Access token lifetime in minutes.
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    /// Refresh token lifetime in minutes.
    #[serde(default = "default_refresh_ttl_minutes")]
    pub refresh_ttl_minutes: i64,
    /// Whether the explicit debug identity override may be used at all.
    #[serde(default)]
    pub allow_debug_auth: bool,
    /// Explicit debug identity override. Refused unless `allow_debug_auth`.
    #[serde(default)]
    pub debug_override: Option<DebugActorRef>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            token_ttl_minutes: DEFAULT_TOKEN_TTL_MINUTES,
            refresh_ttl_minutes: DEFAULT_REFRESH_TTL_MINUTES,
            allow_debug_auth: false,
            debug_override: None,
        }
    }
}

impl AuthConfig {
    /// Validates auth configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when auth settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "auth.secret must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }
        if self.token_ttl_minutes <= 0 || self.token_ttl_minutes > MAX_TOKEN_TTL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_minutes must be in 1..={MAX_TOKEN_TTL_MINUTES}"
            )));
        }
        if self.refresh_ttl_minutes <= 0 || self.refresh_ttl_minutes > MAX_REFRESH_TTL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "auth.refresh_ttl_minutes must be in 1..={MAX_REFRESH_TTL_MINUTES}"
            )));
        }
        if self.refresh_ttl_minutes < self.token_ttl_minutes {
            return Err(ConfigError::Invalid(
                "auth.refresh_ttl_minutes must not be shorter than token ttl".to_string(),
            ));
        }
        if self.debug_override.is_some() && !self.allow_debug_auth {
            return Err(ConfigError::Invalid(
                "auth.debug_override requires auth.allow_debug_auth".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the token codec from the validated settings.
    #[must_use]
    pub fn codec(&self) -> TokenCodec {
        TokenCodec::new(
            self.secret.as_bytes().to_vec(),
            self.token_ttl_minutes * 60,
            self.refresh_ttl_minutes * 60,
        )
    }
}

/// Queue name overrides for the task pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueConfig {
    /// Sample storage queue override.
    #[serde(default)]
    pub storage: Option<String>,
    /// Validation queue override.
    #[serde(default)]
    pub validation: Option<String>,
    /// Enrolment queue override.
    #[serde(default)]
    pub enrolment: Option<String>,
    /// Verification queue override.
    #[serde(default)]
    pub verification: Option<String>,
    /// Alerts queue override.
    #[serde(default)]
    pub alerts: Option<String>,
    /// Reporting queue override.
    #[serde(default)]
    pub reporting: Option<String>,
}

impl QueueConfig {
    /// Validates queue name overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a queue name override is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("storage", &self.storage),
            ("validation", &self.validation),
            ("enrolment", &self.enrolment),
            ("verification", &self.verification),
            ("alerts", &self.alerts),
            ("reporting", &self.reporting),
        ] {
            if let Some(name) = value {
                if name.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "queues.{field} must not be empty"
                    )));
                }
                if name.chars().any(char::is_whitespace) {
                    return Err(ConfigError::Invalid(format!(
                        "queues.{field} must not contain whitespace"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Builds the effective queue topology with defaults filled in.
    #[must_use]
    pub fn topology(&self) -> QueueTopology {
        let defaults = QueueTopology::default();
        QueueTopology {
            storage: override_or(&self.storage, defaults.storage),
            validation: override_or(&self.validation, defaults.validation),
            enrolment: override_or(&self.enrolment, defaults.enrolment),
            verification: override_or(&self.verification, defaults.verification),
            alerts: override_or(&self.alerts, defaults.alerts),
            reporting: override_or(&self.reporting, defaults.reporting),
        }
    }
}

/// Summary polling retry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Base delay in seconds.
    #[serde(default = "default_retry_base_seconds")]
    pub base_seconds: u64,
    /// Additional delay per prior attempt, in seconds.
    #[serde(default = "default_retry_step_seconds")]
    pub step_seconds: u64,
    /// Maximum number of retries before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_seconds: DEFAULT_RETRY_BASE_SECONDS,
            step_seconds: DEFAULT_RETRY_STEP_SECONDS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl RetryConfig {
    /// Validates retry configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when retry settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_seconds == 0 || self.base_seconds > MAX_BACKOFF_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "retry.base_seconds must be in 1..={MAX_BACKOFF_SECONDS}"
            )));
        }
        if self.step_seconds > MAX_BACKOFF_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "retry.step_seconds must be at most {MAX_BACKOFF_SECONDS}"
            )));
        }
        if self.max_retries == 0 || self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "retry.max_retries must be in 1..={MAX_RETRIES}"
            )));
        }
        Ok(())
    }

    /// Builds the effective retry policy.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_seconds: self.base_seconds,
            step_seconds: self.step_seconds,
            max_retries: self.max_retries,
        }
    }
}

/// Blob and database storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for blob storage.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
    /// Database file path. Defaults to `veritrust.db` under the root.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// `SQLite` busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            database: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StorageConfig {
    /// Validates storage configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when storage settings are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("storage.root must be set".to_string()));
        }
        if let Some(database) = &self.database
            && database.as_os_str().is_empty()
        {
            return Err(ConfigError::Invalid("storage.database must not be empty".to_string()));
        }
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "storage.busy_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the `SQLite` store configuration.
    #[must_use]
    pub fn store_config(&self) -> SqliteStoreConfig {
        let path = self
            .database
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_DATABASE_NAME));
        SqliteStoreConfig {
            path,
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Registered webhook client seeds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhooksConfig {
    /// Client seed entries.
    #[serde(default)]
    pub clients: Vec<WebhookClientSeed>,
}

impl WebhooksConfig {
    /// Validates webhook client seeds, including cross-entry ambiguity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a seed is invalid or two enabled seeds
    /// would match the same traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut keys = Vec::new();
        let mut headers = Vec::new();
        for client in &self.clients {
            client.validate()?;
            if keys.contains(&client.id) {
                return Err(ConfigError::Invalid(format!(
                    "webhooks.clients has duplicate id {}",
                    client.id
                )));
            }
            keys.push(client.id);
            if client.enabled {
                let header = client.header.to_ascii_uppercase();
                if headers.contains(&header) {
                    return Err(ConfigError::Invalid(format!(
                        "webhooks.clients has duplicate header {header}"
                    )));
                }
                headers.push(header);
            }
        }
        Ok(())
    }

    /// Builds the webhook client records to seed into the store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a seed does not yield a valid record.
    pub fn records(&self) -> Result<Vec<WebhookClient>, ConfigError> {
        self.clients.iter().map(WebhookClientSeed::record).collect()
    }
}

/// One registered webhook client.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookClientSeed {
    /// Stable client key.
    pub id: u64,
    /// Human-readable client name.
    pub name: String,
    /// Header whose presence attributes traffic to this client.
    pub header: String,
    /// Optional header carrying the sender's message id.
    #[serde(default)]
    pub id_header: Option<String>,
    /// Shared HMAC secret for body signatures.
    pub secret: String,
    /// Handler name the dispatcher routes matched traffic to.
    pub handler: String,
    /// Whether the client participates in matching.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl WebhookClientSeed {
    /// Validates one client seed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the seed is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id == 0 {
            return Err(ConfigError::Invalid("webhooks.clients id must be nonzero".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("webhooks.clients name must be set".to_string()));
        }
        if self.header.trim().is_empty() {
            return Err(ConfigError::Invalid("webhooks.clients header must be set".to_string()));
        }
        if self.secret.len() < MIN_CLIENT_SECRET_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "webhooks.clients secret must be at least {MIN_CLIENT_SECRET_LENGTH} bytes"
            )));
        }
        if self.handler.trim().is_empty() {
            return Err(ConfigError::Invalid("webhooks.clients handler must be set".to_string()));
        }
        Ok(())
    }

    /// Builds the store record for this seed. Headers are normalized to
    /// uppercase to match case-insensitive transport lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the key is out of range.
    pub fn record(&self) -> Result<WebhookClient, ConfigError> {
        let id = WebhookClientId::from_raw(self.id)
            .ok_or_else(|| ConfigError::Invalid("webhooks.clients id must be nonzero".to_string()))?;
        Ok(WebhookClient {
            id,
            name: self.name.clone(),
            header: self.header.to_ascii_uppercase(),
            id_header: self.id_header.as_ref().map(|h| h.to_ascii_uppercase()),
            secret: self.secret.clone(),
            handler: self.handler.clone(),
            enabled: self.enabled,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the default access token lifetime.
const fn default_token_ttl_minutes() -> i64 {
    DEFAULT_TOKEN_TTL_MINUTES
}

/// Returns the default refresh token lifetime.
const fn default_refresh_ttl_minutes() -> i64 {
    DEFAULT_REFRESH_TTL_MINUTES
}

/// Returns the default retry base delay.
const fn default_retry_base_seconds() -> u64 {
    DEFAULT_RETRY_BASE_SECONDS
}

/// Returns the default retry step delay.
const fn default_retry_step_seconds() -> u64 {
    DEFAULT_RETRY_STEP_SECONDS
}

/// Returns the default retry cap.
const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Returns the default blob storage root.
fn default_storage_root() -> PathBuf {
    PathBuf::from("data")
}

/// Returns the default `SQLite` busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

/// Returns true; serde default for opt-out booleans.
const fn default_true() -> bool {
    true
}

/// Applies an optional override on top of a default queue name.
fn override_or(value: &Option<String>, default: QueueName) -> QueueName {
    value.as_ref().map_or(default, |name| QueueName::from(name.as_str()))
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Enforces path length limits before any filesystem access.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if let Component::Normal(part) = component
            && part.len() > MAX_PATH_COMPONENT_LENGTH
        {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
