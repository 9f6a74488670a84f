//! Server configuration.
//!
//! Everything has a default, so `ServerConfig::default()` is a working
//! local setup. The binary layers environment variables on top with
//! [`ServerConfig::from_env`]:
//!
//! | variable | field | default |
//! |---|---|---|
//! | `MEMOMATCH_BIND` | `bind_addr` | `127.0.0.1:8080` |
//! | `MEMOMATCH_TIME_LIMIT_SECS` | `time_limit` | `50` |
//! | `MEMOMATCH_IDLE_TIMEOUT_SECS` | `idle_timeout` | `15` |
//! | `MEMOMATCH_ACCEPT_CLIENT_SCORES` | `accept_client_scores` | `false` |
//! | `SUPABASE_URL` / `SUPABASE_KEY` | `supabase_url` / `supabase_key` | unset |

use std::str::FromStr;
use std::time::Duration;

use memomatch_game::DEFAULT_TIME_LIMIT;

/// Errors from reading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// Only one of a pair of variables that must be set together is set.
    #[error("{present} is set but {missing} is not")]
    Incomplete {
        present: &'static str,
        missing: &'static str,
    },
}

/// Settings for a [`MemomatchServer`](crate::MemomatchServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Time budget for one round. When it runs out the server ends the
    /// round as a failure.
    pub time_limit: Duration,

    /// How long a connection may stay silent before it is closed.
    pub idle_timeout: Duration,

    /// How long a new connection has to send its handshake.
    pub handshake_timeout: Duration,

    /// Whether `SubmitScore` (a client-computed score) is accepted.
    /// Off by default: scores normally come from the server's own round.
    pub accept_client_scores: bool,

    /// Supabase project URL. Both URL and key must be set to use Supabase.
    pub supabase_url: Option<String>,

    /// Supabase API key.
    pub supabase_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            time_limit: DEFAULT_TIME_LIMIT,
            idle_timeout: Duration::from_secs(15),
            handshake_timeout: Duration::from_secs(5),
            accept_client_scores: false,
            supabase_url: None,
            supabase_key: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// See [`from_lookup`](Self::from_lookup).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from defaults overridden by `lookup`.
    ///
    /// Taking a lookup function instead of reading `std::env` directly
    /// lets tests supply variables without touching the real environment.
    ///
    /// # Errors
    /// - [`ConfigError::Invalid`] for unparsable numbers or booleans
    /// - [`ConfigError::Incomplete`] if only one Supabase variable is set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("MEMOMATCH_BIND") {
            config.bind_addr = addr;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "MEMOMATCH_TIME_LIMIT_SECS")? {
            config.time_limit = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "MEMOMATCH_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = parse_var::<bool, _>(&lookup, "MEMOMATCH_ACCEPT_CLIENT_SCORES")? {
            config.accept_client_scores = flag;
        }

        let url = lookup("SUPABASE_URL").filter(|v| !v.is_empty());
        let key = lookup("SUPABASE_KEY").filter(|v| !v.is_empty());
        match (&url, &key) {
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    present: "SUPABASE_URL",
                    missing: "SUPABASE_KEY",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    present: "SUPABASE_KEY",
                    missing: "SUPABASE_URL",
                });
            }
            _ => {}
        }
        config.supabase_url = url;
        config.supabase_key = key;

        Ok(config)
    }

    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn accept_client_scores(mut self, accept: bool) -> Self {
        self.accept_client_scores = accept;
        self
    }

    /// `true` when both Supabase variables are present.
    pub fn uses_supabase(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_key.is_some()
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|e| {
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }
        }),
    }
}
