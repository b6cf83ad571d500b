use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use timeclerk_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let file = ConfigFile::detect();

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field.resolve_source(&file);
        lines.push(format!("- {} = {} (source: {})", field.key, field.value, source));
    }
    lines.join("\n")
}

/// One reportable config key: its effective value plus the env keys that
/// can override it, checked in order.
struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }

    fn resolve_source(&self, file: &ConfigFile) -> String {
        if let Some(env_key) = self.env_keys.iter().find(|key| env::var_os(key).is_some()) {
            return format!("env ({env_key})");
        }
        if file.defines(self.key) {
            return format!("file ({})", file.display());
        }
        "default".to_string()
    }
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let notifier_endpoint = if config.notifier.enabled() {
        config.notifier.endpoint.clone()
    } else {
        "<unset>".to_string()
    };

    vec![
        Field::new("database.url", config.database.url.clone(), &["TIMECLERK_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["TIMECLERK_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["TIMECLERK_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["TIMECLERK_SERVER_BIND_ADDRESS"],
        ),
        Field::new("server.port", config.server.port.to_string(), &["TIMECLERK_SERVER_PORT"]),
        Field::new(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["TIMECLERK_SERVER_HEALTH_CHECK_PORT"],
        ),
        Field::new(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["TIMECLERK_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        Field::new("notifier.endpoint", notifier_endpoint, &["TIMECLERK_NOTIFIER_ENDPOINT"]),
        Field::new(
            "notifier.token",
            redacted(config.notifier.token.is_some()),
            &["TIMECLERK_NOTIFIER_TOKEN"],
        ),
        Field::new(
            "notifier.signing_secret",
            redacted(config.notifier.signing_secret.is_some()),
            &["TIMECLERK_NOTIFIER_SIGNING_SECRET"],
        ),
        Field::new(
            "notifier.timeout_secs",
            config.notifier.timeout_secs.to_string(),
            &["TIMECLERK_NOTIFIER_TIMEOUT_SECS"],
        ),
        Field::new(
            "logging.level",
            config.logging.level.clone(),
            &["TIMECLERK_LOGGING_LEVEL", "TIMECLERK_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            &["TIMECLERK_LOGGING_FORMAT", "TIMECLERK_LOG_FORMAT"],
        ),
    ]
}

/// The discovered config file, if any, with its parsed TOML document.
/// Discovery mirrors the loader: `./timeclerk.toml` wins over
/// `./config/timeclerk.toml`.
struct ConfigFile {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

impl ConfigFile {
    fn detect() -> Self {
        let path = ["timeclerk.toml", "config/timeclerk.toml"]
            .into_iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists());
        let doc = path.as_deref().and_then(parse_toml);
        Self { path, doc }
    }

    fn defines(&self, key_path: &str) -> bool {
        let Some(doc) = &self.doc else {
            return false;
        };
        key_path.split('.').try_fold(doc, |node, key| node.get(key)).is_some()
    }

    fn display(&self) -> String {
        self.path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string())
    }
}

fn parse_toml(path: &Path) -> Option<Value> {
    fs::read_to_string(path).ok()?.parse().ok()
}

fn redacted(present: bool) -> &'static str {
    if present {
        "<redacted>"
    } else {
        "<unset>"
    }
}
