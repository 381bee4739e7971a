//! Runtime configuration, read from environment variables (a `.env` file is
//! loaded first when present).

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite://availabilities.db";
const DEFAULT_TTL_SECONDS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_MAX_EVENT_DAYS: i64 = 366;
const DEFAULT_PURGE_INTERVAL_SECONDS: u64 = 6 * 60 * 60;
const DEFAULT_BACKUP_INTERVAL_SECONDS: u64 = 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub static_dir: PathBuf,
    /// Newline-separated words used for event ids; the built-in list otherwise.
    pub wordlist_path: Option<PathBuf>,
    pub event_ttl_seconds: i64,
    /// Longest date range, in days, an event may cover.
    pub max_event_days: i64,
    pub purge_interval: Duration,
    pub backup_interval: Duration,
    pub backup_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 3000)?;

        let event_ttl_seconds: i64 = parse_or(&lookup, "EVENT_TTL_SECONDS", DEFAULT_TTL_SECONDS)?;
        if event_ttl_seconds <= 0 {
            return Err(ConfigError::Invalid {
                key: "EVENT_TTL_SECONDS",
                value: event_ttl_seconds.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let max_event_days: i64 = parse_or(&lookup, "MAX_EVENT_DAYS", DEFAULT_MAX_EVENT_DAYS)?;
        if max_event_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_EVENT_DAYS",
                value: max_event_days.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        Ok(Config {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: format!("{host}:{port}"),
            static_dir: lookup("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            wordlist_path: lookup("WORDLIST_PATH").map(PathBuf::from),
            event_ttl_seconds,
            max_event_days,
            purge_interval: seconds(
                &lookup,
                "PURGE_INTERVAL_SECONDS",
                DEFAULT_PURGE_INTERVAL_SECONDS,
            )?,
            backup_interval: seconds(
                &lookup,
                "BACKUP_INTERVAL_SECONDS",
                DEFAULT_BACKUP_INTERVAL_SECONDS,
            )?,
            backup_path: lookup("BACKUP_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("availabilities_backup.db")),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn seconds<F>(lookup: &F, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(lookup, key, default)?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: secs.to_string(),
            reason: "interval must be at least one second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.event_ttl_seconds, DEFAULT_TTL_SECONDS);
        assert_eq!(config.purge_interval, Duration::from_secs(21_600));
        assert_eq!(config.backup_interval, Duration::from_secs(3_600));
        assert!(config.wordlist_path.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("EVENT_TTL_SECONDS", "120"),
            ("WORDLIST_PATH", "/tmp/words.txt"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.event_ttl_seconds, 120);
        assert_eq!(config.wordlist_path, Some(PathBuf::from("/tmp/words.txt")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = Config::from_lookup(lookup_from(&[("PURGE_INTERVAL_SECONDS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PURGE_INTERVAL_SECONDS", .. }));
    }
}
