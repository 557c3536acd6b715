//! Process-wide settings, read once from the environment and `.env` files.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Deployment environment name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Local,
    Test,
    Production,
    Other(String),
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Whether the OpenAPI document is served. Only local development gets it.
    pub fn docs_enabled(&self) -> bool {
        matches!(self, Environment::Local)
    }
}

impl FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "local" => Environment::Local,
            "test" => Environment::Test,
            "production" => Environment::Production,
            other => Environment::Other(other.to_string()),
        })
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Local => f.write_str("local"),
            Environment::Test => f.write_str("test"),
            Environment::Production => f.write_str("production"),
            Environment::Other(name) => f.write_str(name),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub environment: Environment,
    pub log: LogSettings,
    pub database: DatabaseSettings,
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// `EnvFilter` directive, e.g. `info` or `item_service=debug,info`.
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Log every SQL statement at info level.
    pub echo: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            log: LogSettings::default(),
            database: DatabaseSettings::default(),
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://item-service.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            echo: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

impl Settings {
    /// Loads `.env.{ENVIRONMENT}` and `.env` from the working directory (in that
    /// priority; real environment variables win over both), then reads settings
    /// from the process environment.
    ///
    /// Runs before the subscriber is installed, so unreadable files are reported
    /// on stderr.
    pub fn from_env() -> Result<Self, SettingsError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "local".into());
        let dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        for problem in load_env_files(&dir, &environment) {
            eprintln!("{}", problem);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Settings::default();
        let environment = match lookup("ENVIRONMENT") {
            Some(v) => v.parse().unwrap_or_default(),
            None => defaults.environment,
        };
        Ok(Self {
            environment,
            log: LogSettings {
                level: lookup("LOG_LEVEL")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(defaults.log.level),
                json: parse_bool(&lookup, "LOG_JSON", defaults.log.json)?,
            },
            database: DatabaseSettings {
                url: lookup("DATABASE_URL")
                    .filter(|v| !v.trim().is_empty())
                    .unwrap_or(defaults.database.url),
                max_connections: parse_or(
                    &lookup,
                    "DATABASE_MAX_CONNECTIONS",
                    defaults.database.max_connections,
                )?,
                acquire_timeout_secs: parse_or(
                    &lookup,
                    "DATABASE_ACQUIRE_TIMEOUT_SECS",
                    defaults.database.acquire_timeout_secs,
                )?,
                echo: parse_bool(&lookup, "DATABASE_ECHO", defaults.database.echo)?,
            },
            bind_addr: parse_or(&lookup, "BIND_ADDR", defaults.bind_addr)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, SettingsError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| SettingsError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(SettingsError::Invalid { key, value }),
        },
        None => Ok(default),
    }
}

/// Loads `.env.{environment}` then `.env` from `dir`. Missing files are skipped;
/// every other failure is returned as a message for the caller to report.
pub fn load_env_files(dir: &Path, environment: &str) -> Vec<String> {
    let mut problems = Vec::new();
    for name in [format!(".env.{}", environment), ".env".to_string()] {
        let path = dir.join(&name);
        if let Err(e) = dotenvy::from_path(&path) {
            if !e.not_found() {
                problems.push(format!("failed to read {}: {}", path.display(), e));
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.environment, Environment::Local);
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.database.max_connections, 5);
        assert!(!settings.database.echo);
        assert_eq!(settings.bind_addr.port(), 8000);
    }

    #[test]
    fn reads_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("ENVIRONMENT", "Production"),
            ("LOG_LEVEL", "debug"),
            ("DATABASE_URL", "sqlite://other.db"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("DATABASE_ECHO", "yes"),
            ("BIND_ADDR", "0.0.0.0:9000"),
        ]))
        .unwrap();
        assert!(settings.environment.is_production());
        assert!(!settings.environment.docs_enabled());
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.database.url, "sqlite://other.db");
        assert_eq!(settings.database.max_connections, 12);
        assert!(settings.database.echo);
        assert_eq!(settings.bind_addr.port(), 9000);
    }

    #[test]
    fn env_file_problems_are_returned_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_env_files(dir.path(), "nowhere").is_empty());

        // A directory where the file should be cannot be read.
        std::fs::create_dir(dir.path().join(".env")).unwrap();
        let problems = load_env_files(dir.path(), "nowhere");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains(".env"));
    }

    #[test]
    fn docs_are_local_only() {
        assert!(Environment::Local.docs_enabled());
        assert!(!Environment::Test.docs_enabled());
        assert!(!Environment::Production.docs_enabled());
        assert!(!Environment::Other("staging".into()).docs_enabled());
    }

    #[test]
    fn unknown_environment_is_kept_by_name() {
        let settings = Settings::from_lookup(lookup(&[("ENVIRONMENT", "staging")])).unwrap();
        assert_eq!(settings.environment, Environment::Other("staging".into()));
        assert_eq!(settings.environment.to_string(), "staging");
        assert!(!settings.environment.docs_enabled());
    }

    #[test]
    fn rejects_malformed_values() {
        let err = Settings::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Invalid { key: "DATABASE_MAX_CONNECTIONS", .. }
        ));

        let err = Settings::from_lookup(lookup(&[("DATABASE_ECHO", "maybe")])).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "DATABASE_ECHO", .. }));
    }
}
