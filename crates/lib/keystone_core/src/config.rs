//! Session configuration.

use std::path::PathBuf;

use chrono::Duration;
use tracing::warn;

use crate::cache::DEFAULT_CLAIMS_TTL_SECS;
use crate::refresh::DEFAULT_REFRESH_PATH;
use crate::store::FileTokenStore;
use crate::token::DEFAULT_EXPIRY_GRACE_SECS;

/// Default request timeout for the refresh call.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration for an [`crate::session::AuthSession`].
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// API base URL the refresh path is resolved against.
    pub api_url: String,
    pub refresh_path: String,
    pub claims_ttl: Duration,
    /// Tokens this close to expiry count as expired.
    pub expiry_grace: Duration,
    pub http_timeout: std::time::Duration,
    pub token_file: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:3100".into(),
            refresh_path: DEFAULT_REFRESH_PATH.into(),
            claims_ttl: Duration::seconds(DEFAULT_CLAIMS_TTL_SECS),
            expiry_grace: Duration::seconds(DEFAULT_EXPIRY_GRACE_SECS),
            http_timeout: std::time::Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            token_file: FileTokenStore::default_path(),
        }
    }
}

impl SessionConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                     | Default                             |
    /// |------------------------------|-------------------------------------|
    /// | `KEYSTONE_API_URL`           | `http://127.0.0.1:3100`             |
    /// | `KEYSTONE_REFRESH_PATH`      | `/auth/refresh`                     |
    /// | `KEYSTONE_CLAIMS_TTL_SECS`   | `300`                               |
    /// | `KEYSTONE_EXPIRY_GRACE_SECS` | `300`                               |
    /// | `KEYSTONE_HTTP_TIMEOUT_SECS` | `30`                                |
    /// | `KEYSTONE_TOKEN_FILE`        | `<data_dir>/keystone/tokens.json`   |
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`SessionConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: i64| -> i64 {
            match lookup(name) {
                Some(raw) => raw.trim().parse::<i64>().ok().filter(|v| *v >= 0).unwrap_or_else(|| {
                    warn!(variable = name, value = %raw, default, "ignoring invalid duration");
                    default
                }),
                None => default,
            }
        };
        let delta = |name: &str, default: i64| -> Duration {
            let value = secs(name, default);
            Duration::try_seconds(value).unwrap_or_else(|| {
                warn!(variable = name, value, default, "duration out of range");
                Duration::seconds(default)
            })
        };

        Self {
            api_url: lookup("KEYSTONE_API_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_url),
            refresh_path: lookup("KEYSTONE_REFRESH_PATH")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.refresh_path),
            claims_ttl: delta("KEYSTONE_CLAIMS_TTL_SECS", DEFAULT_CLAIMS_TTL_SECS),
            expiry_grace: delta("KEYSTONE_EXPIRY_GRACE_SECS", DEFAULT_EXPIRY_GRACE_SECS),
            http_timeout: std::time::Duration::from_secs(
                secs("KEYSTONE_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS as i64) as u64,
            ),
            token_file: lookup("KEYSTONE_TOKEN_FILE")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.token_file),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = SessionConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.api_url, "http://127.0.0.1:3100");
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.claims_ttl, Duration::minutes(5));
        assert_eq!(config.expiry_grace, Duration::minutes(5));
        assert_eq!(config.http_timeout, std::time::Duration::from_secs(30));
        assert!(config.token_file.ends_with("keystone/tokens.json"));
    }

    #[test]
    fn reads_overrides() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("KEYSTONE_API_URL", "https://console.example.com"),
            ("KEYSTONE_REFRESH_PATH", "/api/token/refresh"),
            ("KEYSTONE_CLAIMS_TTL_SECS", "60"),
            ("KEYSTONE_EXPIRY_GRACE_SECS", "0"),
            ("KEYSTONE_TOKEN_FILE", "/tmp/keystone.json"),
        ]));
        assert_eq!(config.api_url, "https://console.example.com");
        assert_eq!(config.refresh_path, "/api/token/refresh");
        assert_eq!(config.claims_ttl, Duration::seconds(60));
        assert_eq!(config.expiry_grace, Duration::zero());
        assert_eq!(config.token_file, PathBuf::from("/tmp/keystone.json"));
    }

    #[test]
    fn invalid_numbers_fall_back_to_defaults() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("KEYSTONE_CLAIMS_TTL_SECS", "five minutes"),
            ("KEYSTONE_HTTP_TIMEOUT_SECS", "-1"),
        ]));
        assert_eq!(config.claims_ttl, Duration::minutes(5));
        assert_eq!(config.http_timeout, std::time::Duration::from_secs(30));
    }

    #[test]
    fn out_of_range_durations_fall_back_to_defaults() {
        let config = SessionConfig::from_lookup(lookup_from(&[
            ("KEYSTONE_CLAIMS_TTL_SECS", "9223372036854775807"),
            ("KEYSTONE_EXPIRY_GRACE_SECS", "9223372036854776"),
        ]));
        assert_eq!(config.claims_ttl, Duration::minutes(5));
        assert_eq!(config.expiry_grace, Duration::minutes(5));
    }
}
