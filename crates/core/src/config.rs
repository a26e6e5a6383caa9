use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub policy: PolicyDataConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

/// Data file locations. Unset paths fall back to the built-in reference data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyDataConfig {
    pub policy_path: Option<PathBuf>,
    pub rates_path: Option<PathBuf>,
    pub roster_path: Option<PathBuf>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
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

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub policy_path: Option<PathBuf>,
    pub rates_path: Option<PathBuf>,
    pub roster_path: Option<PathBuf>,
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
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["approvals.toml", "config/approvals.toml"];

type EnvBinding = (&'static str, fn(&mut AppConfig, &str) -> Result<(), ConfigError>);

/// Applied in order, so each `APPROVALS_LOG_*` alias sits ahead of the
/// `APPROVALS_LOGGING_*` key that overrides it.
const ENV_BINDINGS: [EnvBinding; 10] = [
    ("APPROVALS_SERVER_BIND_ADDRESS", |config, value| {
        config.server.bind_address = value.to_string();
        Ok(())
    }),
    ("APPROVALS_SERVER_PORT", |config, value| {
        config.server.port = parse_env("APPROVALS_SERVER_PORT", value)?;
        Ok(())
    }),
    ("APPROVALS_SERVER_GRACEFUL_SHUTDOWN_SECS", |config, value| {
        config.server.graceful_shutdown_secs =
            parse_env("APPROVALS_SERVER_GRACEFUL_SHUTDOWN_SECS", value)?;
        Ok(())
    }),
    ("APPROVALS_POLICY_PATH", |config, value| {
        config.policy.policy_path = Some(PathBuf::from(value));
        Ok(())
    }),
    ("APPROVALS_RATES_PATH", |config, value| {
        config.policy.rates_path = Some(PathBuf::from(value));
        Ok(())
    }),
    ("APPROVALS_ROSTER_PATH", |config, value| {
        config.policy.roster_path = Some(PathBuf::from(value));
        Ok(())
    }),
    ("APPROVALS_LOG_LEVEL", |config, value| {
        config.logging.level = value.to_string();
        Ok(())
    }),
    ("APPROVALS_LOGGING_LEVEL", |config, value| {
        config.logging.level = value.to_string();
        Ok(())
    }),
    ("APPROVALS_LOG_FORMAT", |config, value| {
        config.logging.format = value.parse()?;
        Ok(())
    }),
    ("APPROVALS_LOGGING_FORMAT", |config, value| {
        config.logging.format = value.parse()?;
        Ok(())
    }),
];

/// Every environment key the loader reads.
pub const ENV_KEYS: [&str; 10] = {
    let mut keys = [""; 10];
    let mut index = 0;
    while index < ENV_BINDINGS.len() {
        keys[index] = ENV_BINDINGS[index].0;
        index += 1;
    }
    keys
};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            policy: PolicyDataConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
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

impl AppConfig {
    /// Layers defaults, the TOML file, `APPROVALS_*` variables and explicit
    /// overrides, in that order, then validates the result.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let LoadOptions { config_path, require_file, overrides } = options;
        let mut config = Self::default();

        match resolve_config_path(config_path.as_deref()) {
            Some(path) => {
                let patch = read_patch(&path)?;
                config.apply_patch(patch, path.parent());
            }
            None if require_file => {
                return Err(ConfigError::MissingConfigFile(
                    config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0])),
                ));
            }
            None => {}
        }

        for (key, apply) in ENV_BINDINGS {
            if let Some(value) = env::var(key).ok().filter(|value| !value.trim().is_empty()) {
                apply(&mut config, &value)?;
            }
        }

        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Relative data paths in the file are resolved against the file's
    /// directory.
    fn apply_patch(&mut self, patch: ConfigPatch, base_dir: Option<&Path>) {
        let server = patch.server.unwrap_or_default();
        set_if_some(&mut self.server.bind_address, server.bind_address);
        set_if_some(&mut self.server.port, server.port);
        set_if_some(&mut self.server.graceful_shutdown_secs, server.graceful_shutdown_secs);

        let anchor = |path: PathBuf| match base_dir {
            Some(base) if path.is_relative() => Some(base.join(path)),
            _ => Some(path),
        };
        let policy = patch.policy.unwrap_or_default();
        set_if_some(&mut self.policy.policy_path, policy.policy_path.map(anchor));
        set_if_some(&mut self.policy.rates_path, policy.rates_path.map(anchor));
        set_if_some(&mut self.policy.roster_path, policy.roster_path.map(anchor));

        let logging = patch.logging.unwrap_or_default();
        set_if_some(&mut self.logging.level, logging.level);
        set_if_some(&mut self.logging.format, logging.format);
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        set_if_some(&mut self.server.bind_address, overrides.bind_address);
        set_if_some(&mut self.server.port, overrides.port);
        set_if_some(&mut self.logging.level, overrides.log_level);
        set_if_some(&mut self.logging.format, overrides.log_format);
        set_if_some(&mut self.policy.policy_path, overrides.policy_path.map(Some));
        set_if_some(&mut self.policy.rates_path, overrides.rates_path.map(Some));
        set_if_some(&mut self.policy.roster_path, overrides.roster_path.map(Some));
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| Err(ConfigError::Validation(message.to_string()));

        if self.server.bind_address.trim().is_empty() {
            return invalid("server.bind_address must not be empty");
        }
        if self.server.port == 0 {
            return invalid("server.port must be greater than zero");
        }
        if self.server.graceful_shutdown_secs == 0 {
            return invalid("server.graceful_shutdown_secs must be greater than zero");
        }

        let data_files = [
            ("policy.policy_path", &self.policy.policy_path),
            ("policy.rates_path", &self.policy.rates_path),
            ("policy.roster_path", &self.policy.roster_path),
        ];
        for (key, path) in data_files {
            if let Some(path) = path.as_deref().filter(|path| !path.is_file()) {
                return Err(ConfigError::Validation(format!(
                    "{key} points at `{}`, which is not a readable file",
                    path.display()
                )));
            }
        }

        if !LOG_LEVELS.contains(&self.logging.level.trim().to_ascii_lowercase().as_str()) {
            return invalid("logging.level must be one of trace|debug|info|warn|error");
        }

        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    match explicit_path {
        Some(path) => path.exists().then(|| path.to_path_buf()),
        None => CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists()),
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces every `${VAR}` with the variable's value. Unset variables are an
/// error rather than an empty string.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find("${") {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let close = after_open.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &after_open[..close];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &after_open[close + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn set_if_some<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    policy: Option<PolicyPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyPatch {
    policy_path: Option<PathBuf>,
    rates_path: Option<PathBuf>,
    roster_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
