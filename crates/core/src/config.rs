//! Layered runtime configuration: built-in defaults, an optional TOML file,
//! `TIMECLERK_*` environment overrides, programmatic overrides, and a final
//! validation pass, applied in that order.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub notifier: NotifierConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Outbound notification delivery. An empty endpoint disables delivery
/// entirely; decisions still succeed, they just notify nobody.
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub token: Option<SecretString>,
    pub signing_secret: Option<SecretString>,
    pub timeout_secs: u64,
}

impl NotifierConfig {
    pub fn enabled(&self) -> bool {
        !self.endpoint.trim().is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "log format must be compact, pretty, or json (got `{other}`)"
            ))),
        }
    }
}

/// Highest-precedence knobs a caller can set in code, ahead of both
/// environment variables and the config file.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub notifier_endpoint: Option<String>,
    pub notifier_token: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file `{0}` does not exist")]
    MissingConfigFile(PathBuf),
    #[error("config file references unset environment variable `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated `${{...}}` interpolation in config file")]
    UnterminatedInterpolation,
    #[error("invalid value `{value}` for environment override `{key}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://timeclerk.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8460,
                health_check_port: 8461,
                graceful_shutdown_secs: 15,
            },
            notifier: NotifierConfig {
                endpoint: String::new(),
                token: None,
                signing_secret: None,
                timeout_secs: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    /// Resolves the effective configuration. Layers apply lowest to highest:
    /// defaults, then the config file (explicit path, `./timeclerk.toml`, or
    /// `./config/timeclerk.toml`), then environment variables, then
    /// `options.overrides`. The result is validated before being returned.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.apply_patch(read_patch(&path)?),
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from("timeclerk.toml"));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            merge(&mut self.database.url, database.url);
            merge(&mut self.database.max_connections, database.max_connections);
            merge(&mut self.database.timeout_secs, database.timeout_secs);
        }

        if let Some(server) = patch.server {
            merge(&mut self.server.bind_address, server.bind_address);
            merge(&mut self.server.port, server.port);
            merge(&mut self.server.health_check_port, server.health_check_port);
            merge(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);
        }

        if let Some(notifier) = patch.notifier {
            merge(&mut self.notifier.endpoint, notifier.endpoint);
            merge(&mut self.notifier.timeout_secs, notifier.timeout_secs);
            if let Some(token) = notifier.token {
                self.notifier.token = Some(SecretString::from(token));
            }
            if let Some(signing_secret) = notifier.signing_secret {
                self.notifier.signing_secret = Some(SecretString::from(signing_secret));
            }
        }

        if let Some(logging) = patch.logging {
            merge(&mut self.logging.level, logging.level);
            merge(&mut self.logging.format, logging.format);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(url) = read_env("TIMECLERK_DATABASE_URL") {
            self.database.url = url;
        }
        self.database.max_connections =
            env_or("TIMECLERK_DATABASE_MAX_CONNECTIONS", self.database.max_connections)?;
        self.database.timeout_secs =
            env_or("TIMECLERK_DATABASE_TIMEOUT_SECS", self.database.timeout_secs)?;

        if let Some(bind_address) = read_env("TIMECLERK_SERVER_BIND_ADDRESS") {
            self.server.bind_address = bind_address;
        }
        self.server.port = env_or("TIMECLERK_SERVER_PORT", self.server.port)?;
        self.server.health_check_port =
            env_or("TIMECLERK_SERVER_HEALTH_CHECK_PORT", self.server.health_check_port)?;
        self.server.graceful_shutdown_secs =
            env_or("TIMECLERK_SERVER_GRACEFUL_SHUTDOWN_SECS", self.server.graceful_shutdown_secs)?;

        if let Some(endpoint) = read_env("TIMECLERK_NOTIFIER_ENDPOINT") {
            self.notifier.endpoint = endpoint;
        }
        if let Some(token) = read_env("TIMECLERK_NOTIFIER_TOKEN") {
            self.notifier.token = Some(SecretString::from(token));
        }
        if let Some(signing_secret) = read_env("TIMECLERK_NOTIFIER_SIGNING_SECRET") {
            self.notifier.signing_secret = Some(SecretString::from(signing_secret));
        }
        self.notifier.timeout_secs =
            env_or("TIMECLERK_NOTIFIER_TIMEOUT_SECS", self.notifier.timeout_secs)?;

        // The short TIMECLERK_LOG_* spellings are accepted alongside the
        // canonical TIMECLERK_LOGGING_* keys.
        if let Some(level) =
            read_env("TIMECLERK_LOGGING_LEVEL").or_else(|| read_env("TIMECLERK_LOG_LEVEL"))
        {
            self.logging.level = level;
        }
        if let Some(format) =
            read_env("TIMECLERK_LOGGING_FORMAT").or_else(|| read_env("TIMECLERK_LOG_FORMAT"))
        {
            self.logging.format = format.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        merge(&mut self.database.url, overrides.database_url);
        merge(&mut self.logging.level, overrides.log_level);
        merge(&mut self.notifier.endpoint, overrides.notifier_endpoint);
        if let Some(token) = overrides.notifier_token {
            self.notifier.token = Some(SecretString::from(token));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_notifier(&self.notifier)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn merge<T>(slot: &mut T, patch: Option<T>) {
    if let Some(value) = patch {
        *slot = value;
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("timeclerk.toml"), PathBuf::from("config/timeclerk.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let expression = &rest[start + 2..];
        let Some(end) = expression.find('}') else {
            return Err(ConfigError::UnterminatedInterpolation);
        };

        let key = &expression[..end];
        let value = env::var(key)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.to_string() })?;
        output.push_str(&value);
        rest = &expression[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let is_sqlite = url == ":memory:" || url.starts_with("sqlite://") || url.starts_with("sqlite::");
    if !is_sqlite {
        return Err(invalid(
            "database.url must point at sqlite (`sqlite://...`, `sqlite::...`, or `:memory:`)",
        ));
    }

    if database.max_connections == 0 {
        return Err(invalid("database.max_connections must be at least 1"));
    }

    if !(1..=300).contains(&database.timeout_secs) {
        return Err(invalid("database.timeout_secs must be between 1 and 300"));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().parse::<std::net::IpAddr>().is_err() {
        return Err(invalid("server.bind_address must parse as an IP address"));
    }

    if server.port == 0 {
        return Err(invalid("server.port must be nonzero"));
    }

    if server.health_check_port == 0 {
        return Err(invalid("server.health_check_port must be nonzero"));
    }

    if server.port == server.health_check_port {
        return Err(invalid("server.health_check_port must differ from server.port"));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(invalid("server.graceful_shutdown_secs must be at least 1"));
    }

    Ok(())
}

fn validate_notifier(notifier: &NotifierConfig) -> Result<(), ConfigError> {
    if notifier.enabled() {
        let endpoint = notifier.endpoint.trim();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(invalid("notifier.endpoint must be an http:// or https:// URL"));
        }
    }

    if !(1..=300).contains(&notifier.timeout_secs) {
        return Err(invalid("notifier.timeout_secs must be between 1 and 300"));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    match logging.level.trim().to_ascii_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(invalid("logging.level must be one of: trace, debug, info, warn, error")),
    }
}

/// Reads an env var, treating blank values the same as unset ones.
fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Returns the parsed env override for `key`, or `current` when the
/// variable is absent or blank.
fn env_or<T: std::str::FromStr>(key: &str, current: T) -> Result<T, ConfigError> {
    match read_env(key) {
        Some(value) => parse_env(key, &value),
        None => Ok(current),
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    notifier: Option<NotifierPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NotifierPatch {
    endpoint: Option<String>,
    token: Option<String>,
    signing_secret: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    const MANAGED_VARS: &[&str] = &[
        "TIMECLERK_DATABASE_URL",
        "TIMECLERK_DATABASE_MAX_CONNECTIONS",
        "TIMECLERK_DATABASE_TIMEOUT_SECS",
        "TIMECLERK_SERVER_BIND_ADDRESS",
        "TIMECLERK_SERVER_PORT",
        "TIMECLERK_SERVER_HEALTH_CHECK_PORT",
        "TIMECLERK_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "TIMECLERK_NOTIFIER_ENDPOINT",
        "TIMECLERK_NOTIFIER_TOKEN",
        "TIMECLERK_NOTIFIER_SIGNING_SECRET",
        "TIMECLERK_NOTIFIER_TIMEOUT_SECS",
        "TIMECLERK_LOGGING_LEVEL",
        "TIMECLERK_LOG_LEVEL",
        "TIMECLERK_LOGGING_FORMAT",
        "TIMECLERK_LOG_FORMAT",
    ];

    /// Serializes env-touching tests and scrubs every config variable on
    /// entry and again on drop, so a panicking test cannot leak state into
    /// the next one.
    struct EnvSandbox {
        extra: Vec<&'static str>,
        _guard: MutexGuard<'static, ()>,
    }

    impl EnvSandbox {
        fn new() -> Self {
            static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
            let guard = match LOCK.get_or_init(|| Mutex::new(())).lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            for var in MANAGED_VARS {
                env::remove_var(var);
            }
            Self { extra: Vec::new(), _guard: guard }
        }

        fn set(&mut self, key: &'static str, value: &str) {
            if !MANAGED_VARS.contains(&key) {
                self.extra.push(key);
            }
            env::set_var(key, value);
        }
    }

    impl Drop for EnvSandbox {
        fn drop(&mut self) {
            for var in MANAGED_VARS {
                env::remove_var(var);
            }
            for var in &self.extra {
                env::remove_var(var);
            }
        }
    }

    #[test]
    fn defaults_load_without_file_or_env() {
        let _env = EnvSandbox::new();

        let config = AppConfig::load(LoadOptions::default()).expect("defaults should validate");

        assert_eq!(config.database.url, "sqlite://timeclerk.db?mode=rwc");
        assert_eq!(config.server.port, 8460);
        assert_eq!(config.server.health_check_port, 8461);
        assert!(!config.notifier.enabled());
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn file_load_supports_env_interpolation() {
        let mut sandbox = EnvSandbox::new();
        sandbox.set("TEST_NOTIFIER_ENDPOINT", "https://hooks.example.test/timeclerk");
        sandbox.set("TEST_NOTIFIER_TOKEN", "token-from-env");

        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("timeclerk.toml");
        fs::write(
            &path,
            r#"
[notifier]
endpoint = "${TEST_NOTIFIER_ENDPOINT}"
token = "${TEST_NOTIFIER_TOKEN}"
"#,
        )
        .expect("write config file");

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .expect("interpolated config should load");

        assert_eq!(config.notifier.endpoint, "https://hooks.example.test/timeclerk");
        let token = config.notifier.token.as_ref().expect("token should be present");
        assert_eq!(token.expose_secret(), "token-from-env");
    }

    #[test]
    fn unterminated_interpolation_is_rejected() {
        let _env = EnvSandbox::new();

        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("timeclerk.toml");
        fs::write(&path, "[database]\nurl = \"${TIMECLERK_DB\"\n").expect("write config file");

        let error =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .expect_err("open-ended interpolation should fail");

        assert!(matches!(error, ConfigError::UnterminatedInterpolation));
    }

    #[test]
    fn missing_required_file_is_reported() {
        let _env = EnvSandbox::new();

        let missing = PathBuf::from("definitely-absent-timeclerk.toml");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        })
        .expect_err("load should fail without the required file");

        assert!(matches!(error, ConfigError::MissingConfigFile(path) if path == missing));
    }

    #[test]
    fn logging_env_aliases_are_supported() {
        let mut sandbox = EnvSandbox::new();
        sandbox.set("TIMECLERK_LOG_LEVEL", "warn");
        sandbox.set("TIMECLERK_LOG_FORMAT", "pretty");

        let config = AppConfig::load(LoadOptions::default()).expect("aliased env vars should load");

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn precedence_is_override_env_file_default() {
        let mut sandbox = EnvSandbox::new();
        sandbox.set("TIMECLERK_DATABASE_URL", "sqlite://from-env.db");
        sandbox.set("TIMECLERK_NOTIFIER_ENDPOINT", "https://from-env.example.test/hook");

        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join("timeclerk.toml");
        fs::write(
            &path,
            r#"
[database]
url = "sqlite://from-file.db"

[notifier]
endpoint = "https://from-file.example.test/hook"

[logging]
level = "warn"
"#,
        )
        .expect("write config file");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-override.db".to_string()),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("layered config should load");

        assert_eq!(config.database.url, "sqlite://from-override.db");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.notifier.endpoint, "https://from-env.example.test/hook");
        assert_eq!(config.server.port, 8460);
    }

    #[test]
    fn validation_rejects_non_http_notifier_endpoint() {
        let mut sandbox = EnvSandbox::new();
        sandbox.set("TIMECLERK_NOTIFIER_ENDPOINT", "ftp://hooks.example.test/timeclerk");

        let error =
            AppConfig::load(LoadOptions::default()).expect_err("ftp endpoint should be rejected");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("notifier.endpoint")
        ));
    }

    #[test]
    fn invalid_env_override_names_the_key() {
        let mut sandbox = EnvSandbox::new();
        sandbox.set("TIMECLERK_DATABASE_MAX_CONNECTIONS", "plenty");

        let error = AppConfig::load(LoadOptions::default())
            .expect_err("non-numeric override should be rejected");

        assert!(matches!(
            error,
            ConfigError::InvalidEnvOverride { ref key, .. }
                if key == "TIMECLERK_DATABASE_MAX_CONNECTIONS"
        ));
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() {
        let mut sandbox = EnvSandbox::new();
        sandbox.set("TIMECLERK_NOTIFIER_ENDPOINT", "https://hooks.example.test/timeclerk");
        sandbox.set("TIMECLERK_NOTIFIER_TOKEN", "tok-secret-value");
        sandbox.set("TIMECLERK_NOTIFIER_SIGNING_SECRET", "sig-secret-value");

        let config = AppConfig::load(LoadOptions::default()).expect("notifier config should load");
        let debug = format!("{config:?}");

        assert!(!debug.contains("tok-secret-value"));
        assert!(!debug.contains("sig-secret-value"));
    }
}
