//! Configuration loading and data folder resolution
//!
//! Every setting resolves with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! the remaining tiers are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 60 * 60 * 24 * 7;
pub const DEFAULT_PASSWORD_ROUNDS: u32 = 600_000;
pub const DEFAULT_EMAIL_FROM: &str = "MediMind <reminders@medimind.in>";
pub const DEFAULT_LLM_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_LLM_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.tavily.com/search";
pub const DEFAULT_RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
pub const DEFAULT_FIREBASE_CREDENTIALS: &str = "firebase_credentials.json";
/// IST (UTC+05:30)
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MATCH_WINDOW_MINUTES: u32 = 2;
pub const DEFAULT_KEEPALIVE_INTERVAL_SECS: u64 = 600;
pub const DATABASE_FILE_NAME: &str = "medimind.db";

// ============================================================================
// TOML file schema
// ============================================================================

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub data_dir: Option<PathBuf>,
    pub server: ServerSection,
    pub logging: LoggingConfig,
    pub auth: AuthSection,
    pub ocr: ApiSection,
    pub llm: LlmSection,
    pub search: ApiSection,
    pub email: EmailSection,
    pub push: PushSection,
    pub scheduler: SchedulerSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub session_ttl_seconds: Option<u64>,
    pub password_rounds: Option<u32>,
}

/// Shared shape for keyed vendor APIs (OCR, web search)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailSection {
    pub enabled: Option<bool>,
    pub resend_api_key: Option<String>,
    pub from: Option<String>,
    pub reply_to: Option<String>,
    pub test_recipient: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PushSection {
    pub credentials_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub utc_offset_minutes: Option<i32>,
    pub check_interval_secs: Option<u64>,
    pub match_window_minutes: Option<u32>,
    pub keepalive_url: Option<String>,
    pub keepalive_interval_secs: Option<u64>,
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
    }

    /// Load the TOML file if present, otherwise defaults
    ///
    /// Missing or malformed files log a warning and fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            info!("No config file at {} (using defaults)", path.display());
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} (using defaults)", e);
                Self::default()
            }
        }
    }
}

/// Default TOML location: `<config_dir>/medimind/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("medimind").join("config.toml"))
}

/// Get OS-dependent default data folder path
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("medimind"))
        .unwrap_or_else(|| PathBuf::from("./medimind_data"))
}

// ============================================================================
// Resolved configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl_seconds: u64,
    pub password_rounds: u32,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub enabled: bool,
    pub resend_api_key: Option<String>,
    pub from: String,
    pub reply_to: Option<String>,
    pub test_recipient: Option<String>,
    pub endpoint: String,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub credentials_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Offset of the users' wall clock from UTC
    pub utc_offset_minutes: i32,
    pub check_interval_secs: u64,
    /// Tolerance around a scheduled HH:MM, in minutes
    pub match_window_minutes: u32,
    /// Public URL pinged periodically to keep a free-tier host awake
    pub keepalive_url: Option<String>,
    pub keepalive_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            match_window_minutes: DEFAULT_MATCH_WINDOW_MINUTES,
            keepalive_url: None,
            keepalive_interval_secs: DEFAULT_KEEPALIVE_INTERVAL_SECS,
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub log_level: String,
    pub auth: AuthConfig,
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub email: EmailConfig,
    pub push: PushConfig,
    pub scheduler: SchedulerConfig,
}

impl ServiceConfig {
    /// Resolve from CLI, the process environment and a TOML file
    pub fn load(cli: &CliOverrides, toml: &TomlConfig) -> Self {
        Self::resolve(cli, toml, |name| std::env::var(name).ok())
    }

    /// Resolve with an injectable environment lookup
    pub fn resolve<F>(cli: &CliOverrides, toml: &TomlConfig, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty variables count as unset
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let host = cli
            .host
            .clone()
            .or_else(|| env("HOST"))
            .or_else(|| toml.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli
            .port
            .or_else(|| parse_env(&env, "PORT"))
            .or(toml.server.port)
            .unwrap_or(DEFAULT_PORT);

        let data_dir = DataDirResolver {
            cli: cli.data_dir.clone(),
            env: env("MEDIMIND_DATA_DIR").map(PathBuf::from),
            toml: toml.data_dir.clone(),
        }
        .resolve();

        let database_path = env("DATABASE_URL")
            .map(|url| sqlite_path_from_url(&url))
            .unwrap_or_else(|| data_dir.join(DATABASE_FILE_NAME));

        let auth = AuthConfig {
            session_ttl_seconds: parse_env(&env, "SESSION_TTL_SECONDS")
                .or(toml.auth.session_ttl_seconds)
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            password_rounds: toml.auth.password_rounds.unwrap_or(DEFAULT_PASSWORD_ROUNDS),
        };

        let ocr = OcrConfig {
            api_key: env("OCR_SPACE_API_KEY").or_else(|| toml.ocr.api_key.clone()),
            endpoint: toml
                .ocr
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_OCR_ENDPOINT.to_string()),
        };

        let llm = LlmConfig {
            api_key: env("GROQ_API_KEY").or_else(|| toml.llm.api_key.clone()),
            endpoint: toml
                .llm
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_LLM_ENDPOINT.to_string()),
            model: env("GROQ_MODEL")
                .or_else(|| toml.llm.model.clone())
                .unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
        };

        let search = SearchConfig {
            api_key: env("TAVILY_API_KEY").or_else(|| toml.search.api_key.clone()),
            endpoint: toml
                .search
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_SEARCH_ENDPOINT.to_string()),
        };

        let email = EmailConfig {
            enabled: env("EMAIL_ENABLED")
                .map(|v| v.trim().eq_ignore_ascii_case("true"))
                .or(toml.email.enabled)
                .unwrap_or(false),
            resend_api_key: env("RESEND_API_KEY").or_else(|| toml.email.resend_api_key.clone()),
            from: env("EMAIL_FROM")
                .or_else(|| toml.email.from.clone())
                .unwrap_or_else(|| DEFAULT_EMAIL_FROM.to_string()),
            reply_to: env("EMAIL_REPLY_TO").or_else(|| toml.email.reply_to.clone()),
            test_recipient: env("TEST_EMAIL_TO").or_else(|| toml.email.test_recipient.clone()),
            endpoint: toml
                .email
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_RESEND_ENDPOINT.to_string()),
        };

        let push = PushConfig {
            credentials_path: env("FIREBASE_CREDENTIALS_PATH")
                .map(PathBuf::from)
                .or_else(|| toml.push.credentials_path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FIREBASE_CREDENTIALS)),
        };

        let scheduler = SchedulerConfig {
            utc_offset_minutes: parse_env(&env, "REMINDER_UTC_OFFSET_MINUTES")
                .or(toml.scheduler.utc_offset_minutes)
                .unwrap_or(DEFAULT_UTC_OFFSET_MINUTES),
            check_interval_secs: toml
                .scheduler
                .check_interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_CHECK_INTERVAL_SECS),
            match_window_minutes: toml
                .scheduler
                .match_window_minutes
                .unwrap_or(DEFAULT_MATCH_WINDOW_MINUTES),
            keepalive_url: env("RENDER_EXTERNAL_URL")
                .or_else(|| toml.scheduler.keepalive_url.clone())
                .map(|url| url.trim_end_matches('/').to_string()),
            keepalive_interval_secs: toml
                .scheduler
                .keepalive_interval_secs
                .filter(|s| *s > 0)
                .unwrap_or(DEFAULT_KEEPALIVE_INTERVAL_SECS),
        };

        Self {
            host,
            port,
            data_dir,
            database_path,
            log_level: toml.logging.level.clone(),
            auth,
            ocr,
            llm,
            search,
            email,
            push,
            scheduler,
        }
    }

    /// `host:port` listen address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a numeric environment variable, warning (not failing) on bad input
fn parse_env<T, F>(env: &F, name: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = env(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid number", name, raw);
            None
        }
    }
}

/// Accept `sqlite://path?opts`, `sqlite:path` or a bare path
fn sqlite_path_from_url(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    PathBuf::from(path)
}

/// Mask a secret for logs and diagnostics: first 8 chars then `***`
pub fn mask_secret(secret: Option<&str>) -> String {
    match secret {
        Some(s) if !s.is_empty() => {
            let prefix: String = s.chars().take(8).collect();
            format!("{}***", prefix)
        }
        _ => "NOT SET".to_string(),
    }
}

// ============================================================================
// Data folder initialization
// ============================================================================

/// Picks the data folder from the first tier that supplies one
#[derive(Debug, Clone, Default)]
pub struct DataDirResolver {
    pub cli: Option<PathBuf>,
    pub env: Option<PathBuf>,
    pub toml: Option<PathBuf>,
}

impl DataDirResolver {
    pub fn resolve(self) -> PathBuf {
        self.cli
            .or(self.env)
            .or(self.toml)
            .unwrap_or_else(default_data_dir)
    }
}

/// Creates the data folder and locates the database inside it
pub struct DataDirInitializer {
    data_dir: PathBuf,
}

impl DataDirInitializer {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Create the data folder if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
            info!("Created data folder: {}", self.data_dir.display());
        }
        Ok(())
    }
}
