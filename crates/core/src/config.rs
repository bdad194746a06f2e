use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub stripe: StripeConfig,
    pub assist: AssistConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub api_version: String,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub secret_key: SecretString,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct AssistConfig {
    pub enabled: bool,
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub api_version: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: Option<String>,
    pub assist_enabled: Option<bool>,
    pub assist_api_key: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_owned(),
                port: 8080,
                api_version: "v1".to_owned(),
            },
            database: DatabaseConfig {
                url: "sqlite://stayline.db".to_owned(),
                max_connections: 5,
                timeout_secs: 30,
            },
            stripe: StripeConfig {
                secret_key: String::new().into(),
                api_base: "https://api.stripe.com".to_owned(),
            },
            assist: AssistConfig {
                enabled: false,
                api_key: None,
                base_url: "https://api.openai.com".to_owned(),
                model: "gpt-4o-mini".to_owned(),
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_owned(), format: LogFormat::Compact },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    database: Option<DatabasePatch>,
    stripe: Option<StripePatch>,
    assist: Option<AssistPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    api_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StripePatch {
    secret_key: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssistPatch {
    enabled: Option<bool>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("stayline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(api_version) = server.api_version {
                self.server.api_version = api_version;
            }
        }

        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(stripe) = patch.stripe {
            if let Some(secret_key) = stripe.secret_key {
                self.stripe.secret_key = secret_key.into();
            }
            if let Some(api_base) = stripe.api_base {
                self.stripe.api_base = api_base;
            }
        }

        if let Some(assist) = patch.assist {
            if let Some(enabled) = assist.enabled {
                self.assist.enabled = enabled;
            }
            if let Some(api_key) = assist.api_key {
                self.assist.api_key = Some(api_key.into());
            }
            if let Some(base_url) = assist.base_url {
                self.assist.base_url = base_url;
            }
            if let Some(model) = assist.model {
                self.assist.model = model;
            }
            if let Some(timeout_secs) = assist.timeout_secs {
                self.assist.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("STAYLINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("STAYLINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_number("STAYLINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("STAYLINE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_number("STAYLINE_DATABASE_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("STAYLINE_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("STAYLINE_PORT") {
            self.server.port = parse_number("STAYLINE_PORT", &value)?;
        }
        if let Some(value) = read_env("STAYLINE_API_VERSION") {
            self.server.api_version = value;
        }
        if let Some(value) = read_env("STAYLINE_STRIPE_SECRET_KEY") {
            self.stripe.secret_key = value.into();
        }
        if let Some(value) = read_env("STAYLINE_STRIPE_API_BASE") {
            self.stripe.api_base = value;
        }
        if let Some(value) = read_env("STAYLINE_ASSIST_ENABLED") {
            self.assist.enabled = parse_bool("STAYLINE_ASSIST_ENABLED", &value)?;
        }
        if let Some(value) = read_env("STAYLINE_ASSIST_API_KEY") {
            self.assist.api_key = Some(value.into());
        }
        if let Some(value) = read_env("STAYLINE_ASSIST_BASE_URL") {
            self.assist.base_url = value;
        }
        if let Some(value) = read_env("STAYLINE_ASSIST_MODEL") {
            self.assist.model = value;
        }
        if let Some(value) = read_env("STAYLINE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("STAYLINE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(api_version) = overrides.api_version {
            self.server.api_version = api_version;
        }
        if let Some(stripe_secret_key) = overrides.stripe_secret_key {
            self.stripe.secret_key = stripe_secret_key.into();
        }
        if let Some(stripe_api_base) = overrides.stripe_api_base {
            self.stripe.api_base = stripe_api_base;
        }
        if let Some(assist_enabled) = overrides.assist_enabled {
            self.assist.enabled = assist_enabled;
        }
        if let Some(assist_api_key) = overrides.assist_api_key {
            self.assist.api_key = Some(assist_api_key.into());
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_owned()));
        }
        if self.server.api_version.trim().is_empty() {
            return Err(ConfigError::Validation(
                "server.api_version must not be empty".to_owned(),
            ));
        }
        if self.assist.enabled && self.assist.api_key.is_none() {
            return Err(ConfigError::Validation(
                "assist.api_key is required when assist.enabled is true".to_owned(),
            ));
        }
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("stayline.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_owned(),
        value: value.to_owned(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_owned(),
            value: value.to_owned(),
        }),
    }
}
