use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default push period, matching the browser sync script.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
/// Loads may hit scrape-backed endpoints, so they get a long deadline.
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_SAVE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 3;
pub const DEFAULT_LEARNING_MAX_ENTRIES: usize = 5000;

/// Synchronization configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the remote store, without trailing slash.
    pub api_url: String,
    /// User key the settings document is stored under.
    pub user_key: String,
    pub sync_interval: Duration,
    pub load_timeout: Duration,
    pub save_timeout: Duration,
    /// How long a host lets the shutdown flush run before exiting.
    pub shutdown_grace: Duration,
    /// Bound on the local learning log. `0` means unbounded.
    pub learning_max_entries: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            user_key: "default".into(),
            sync_interval: Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
            load_timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
            save_timeout: Duration::from_secs(DEFAULT_SAVE_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            learning_max_entries: DEFAULT_LEARNING_MAX_ENTRIES,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `PRICING_API_URL`      | `http://localhost:8000` |
    /// | `SYNC_USER_KEY`        | `default`               |
    /// | `SYNC_INTERVAL_SECS`   | `30`                    |
    /// | `LOAD_TIMEOUT_SECS`    | `60`                    |
    /// | `SAVE_TIMEOUT_SECS`    | `10`                    |
    /// | `SHUTDOWN_GRACE_SECS`  | `3`                     |
    /// | `LEARNING_MAX_ENTRIES` | `5000` (`0` = no limit) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary
    /// lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_url = lookup("PRICING_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.api_url);

        let user_key = lookup("SYNC_USER_KEY")
            .filter(|key| !key.trim().is_empty())
            .unwrap_or(defaults.user_key);

        Ok(Self {
            api_url,
            user_key,
            sync_interval: positive_secs(
                &lookup,
                "SYNC_INTERVAL_SECS",
                DEFAULT_SYNC_INTERVAL_SECS,
            )?,
            load_timeout: positive_secs(&lookup, "LOAD_TIMEOUT_SECS", DEFAULT_LOAD_TIMEOUT_SECS)?,
            save_timeout: positive_secs(&lookup, "SAVE_TIMEOUT_SECS", DEFAULT_SAVE_TIMEOUT_SECS)?,
            shutdown_grace: Duration::from_secs(parse_var(
                &lookup,
                "SHUTDOWN_GRACE_SECS",
                "an integer number of seconds",
                DEFAULT_SHUTDOWN_GRACE_SECS,
            )?),
            learning_max_entries: parse_var(
                &lookup,
                "LEARNING_MAX_ENTRIES",
                "a non-negative integer",
                DEFAULT_LEARNING_MAX_ENTRIES,
            )?,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset.
pub fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            var,
            expected,
            value: raw,
        }),
    }
}

/// Parse a whole number of seconds that must not be zero.
fn positive_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    const EXPECTED: &str = "a positive number of seconds";
    match parse_var(lookup, var, EXPECTED, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            expected: EXPECTED,
            value: "0".into(),
        }),
        secs => Ok(Duration::from_secs(secs)),
    }
}
