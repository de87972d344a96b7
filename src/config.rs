//! Library configuration with environment overrides.

use std::env;

use chrono::Duration;

use crate::token::MIN_TOKEN_BYTES;

const DEFAULT_RESET_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_MIN_PASSWORD_LEN: usize = 8;

pub const ENV_RESET_TTL_SECONDS: &str = "SERURO_RESET_TTL_SECONDS";
pub const ENV_TOKEN_BYTES: &str = "SERURO_TOKEN_BYTES";
pub const ENV_MIN_PASSWORD_LEN: &str = "SERURO_MIN_PASSWORD_LEN";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    reset_ttl_seconds: i64,
    token_bytes: usize,
    min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            reset_ttl_seconds: DEFAULT_RESET_TTL_SECONDS,
            token_bytes: MIN_TOKEN_BYTES,
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    /// Read overrides from the environment; unset or unparsable variables
    /// keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::new();
        let config = match env_parse(ENV_RESET_TTL_SECONDS) {
            Some(seconds) => config.with_reset_ttl_seconds(seconds),
            None => config,
        };
        let config = match env_parse(ENV_TOKEN_BYTES) {
            Some(bytes) => config.with_token_bytes(bytes),
            None => config,
        };
        match env_parse(ENV_MIN_PASSWORD_LEN) {
            Some(len) => config.with_min_password_len(len),
            None => config,
        }
    }

    #[must_use]
    pub fn with_reset_ttl_seconds(mut self, seconds: i64) -> Self {
        self.reset_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_min_password_len(mut self, len: usize) -> Self {
        self.min_password_len = len;
        self
    }

    /// Reset-token validity window. Non-positive values fall back to the
    /// 1-hour default.
    #[must_use]
    pub fn reset_ttl(&self) -> Duration {
        if self.reset_ttl_seconds > 0 {
            Duration::seconds(self.reset_ttl_seconds)
        } else {
            Duration::seconds(DEFAULT_RESET_TTL_SECONDS)
        }
    }

    /// Entropy per issued token; values below the 32-byte minimum are raised
    /// to it.
    #[must_use]
    pub fn token_bytes(&self) -> usize {
        self.token_bytes.max(MIN_TOKEN_BYTES)
    }

    #[must_use]
    pub fn min_password_len(&self) -> usize {
        self.min_password_len
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}
