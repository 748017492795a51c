//! Client configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use reqwest::Url;
use schafkopf::SortMode;
use std::time::Duration;

/// Fixed delays driving the state re-requests and notice expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Delay between the socket opening and the first `get_state`
    pub initial_state_delay: Duration,
    /// Delay before re-requesting a snapshot that lacked the seat index
    pub missing_seat_retry: Duration,
    /// Delay before re-requesting after `game_not_ready`
    pub not_ready_retry: Duration,
    /// How long a `play_error` notice stays visible
    pub play_error_ttl: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            initial_state_delay: Duration::from_millis(100),
            missing_seat_retry: Duration::from_millis(500),
            not_ready_retry: Duration::from_millis(1000),
            play_error_ttl: Duration::from_secs(5),
        }
    }
}

/// Complete client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// HTTP(S) base URL of the game server
    pub server_url: String,
    /// Bearer credential for the WebSocket handshake
    pub token: Option<String>,
    /// Room to open a session for
    pub room_id: Option<String>,
    /// Local user identifier, informational only
    pub user_id: Option<String>,
    /// Retry and expiry delays
    pub timings: Timings,
    /// Initial hand ordering
    pub sort_mode: SortMode,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000".to_string(),
            token: None,
            room_id: None,
            user_id: None,
            timings: Timings::default(),
            sort_mode: SortMode::Suit,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// Every value has a default except the credential and room, which stay
    /// `None` when unset. Command-line flags are applied on top by the caller.
    pub fn from_env() -> Self {
        let defaults = Timings::default();
        let timings = Timings {
            initial_state_delay: parse_millis_or(
                "SK_INITIAL_STATE_DELAY_MS",
                defaults.initial_state_delay,
            ),
            missing_seat_retry: parse_millis_or(
                "SK_MISSING_SEAT_RETRY_MS",
                defaults.missing_seat_retry,
            ),
            not_ready_retry: parse_millis_or("SK_NOT_READY_RETRY_MS", defaults.not_ready_retry),
            play_error_ttl: parse_millis_or("SK_PLAY_ERROR_TTL_MS", defaults.play_error_ttl),
        };

        Self {
            server_url: std::env::var("SK_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            token: non_empty_env("SK_TOKEN"),
            room_id: non_empty_env("SK_ROOM"),
            user_id: non_empty_env("SK_USER"),
            timings,
            sort_mode: parse_env_or("SK_SORT_MODE", SortMode::Suit),
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "SK_SERVER_URL".to_string(),
                hint: "Set it or pass --server, e.g. http://localhost:8000".to_string(),
            });
        }

        let url = Url::parse(&self.server_url).map_err(|e| ConfigError::Invalid {
            var: "SK_SERVER_URL".to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                var: "SK_SERVER_URL".to_string(),
                reason: format!("Scheme must be http or https, got '{}'", url.scheme()),
            });
        }

        let delays = [
            ("SK_INITIAL_STATE_DELAY_MS", self.timings.initial_state_delay),
            ("SK_MISSING_SEAT_RETRY_MS", self.timings.missing_seat_retry),
            ("SK_NOT_READY_RETRY_MS", self.timings.not_ready_retry),
            ("SK_PLAY_ERROR_TTL_MS", self.timings.play_error_ttl),
        ];
        for (var, delay) in delays {
            if delay.is_zero() {
                return Err(ConfigError::Invalid {
                    var: var.to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }
        }

        Ok(())
    }

    /// WebSocket endpoint for `room_id`, authenticated by `token`.
    ///
    /// `http` upgrades to `ws` and `https` to `wss`. The token travels as
    /// the `token` query parameter.
    pub fn endpoint(&self, room_id: &str, token: &str) -> Result<Url, ConfigError> {
        let invalid = |reason: String| ConfigError::Invalid {
            var: "SK_SERVER_URL".to_string(),
            reason,
        };

        let mut url = Url::parse(&self.server_url).map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => return Err(invalid(format!("Unsupported scheme '{other}'"))),
        };
        url.set_scheme(scheme)
            .map_err(|_| invalid(format!("Cannot switch to '{scheme}'")))?;

        url.path_segments_mut()
            .map_err(|_| invalid("URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push("ws")
            .push(room_id);
        url.query_pairs_mut().clear().append_pair("token", token);

        Ok(url)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_millis_or(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
