//! CSRF configuration, passed explicitly to the token manager.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::error::ConfigError;

/// Minimum random bytes per token (128 bits).
pub const MIN_TOKEN_BYTES: usize = 16;

/// Default random bytes per token (256 bits).
const DEFAULT_TOKEN_BYTES: usize = 32;

/// Default token validity period in seconds (1 hour).
const DEFAULT_LIFETIME_SECS: u64 = 3600;

/// CSRF token manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfConfig {
    /// How long an issued token stays valid (default: 1 hour).
    pub token_lifetime: Duration,

    /// Whether a token is invalidated after its first successful verification (default: true).
    pub single_use: bool,

    /// Payload key carrying the submitted token (default: `csrf_token`).
    pub field_name: String,

    /// Session key under which the token is stored (default: `_csrf_token`).
    pub session_key: String,

    /// Random bytes drawn per token (default: 32, minimum 16).
    pub token_bytes: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(DEFAULT_LIFETIME_SECS),
            single_use: true,
            field_name: "csrf_token".to_string(),
            session_key: "_csrf_token".to_string(),
            token_bytes: DEFAULT_TOKEN_BYTES,
        }
    }
}

impl CsrfConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let token_lifetime = match env::var("FORMGUARD_CSRF_LIFETIME_SECS") {
            Ok(v) => Duration::from_secs(
                v.parse()
                    .context("FORMGUARD_CSRF_LIFETIME_SECS must be a valid u64")?,
            ),
            Err(_) => defaults.token_lifetime,
        };

        let single_use = match env::var("FORMGUARD_CSRF_SINGLE_USE") {
            Ok(v) => parse_flag(&v).context("FORMGUARD_CSRF_SINGLE_USE must be true or false")?,
            Err(_) => defaults.single_use,
        };

        let field_name = env::var("FORMGUARD_CSRF_FIELD").unwrap_or(defaults.field_name);

        let token_bytes = match env::var("FORMGUARD_CSRF_TOKEN_BYTES") {
            Ok(v) => v
                .parse()
                .context("FORMGUARD_CSRF_TOKEN_BYTES must be a valid usize")?,
            Err(_) => defaults.token_bytes,
        };

        let config = Self {
            token_lifetime,
            single_use,
            field_name,
            session_key: defaults.session_key,
            token_bytes,
        };
        config.validate().context("invalid CSRF configuration")?;
        Ok(config)
    }

    /// Set the token lifetime.
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Enable or disable single-use tokens.
    pub fn single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    /// Set the payload field name for the token.
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Check the configuration for values that would weaken protection.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::TokenTooShort {
                min: MIN_TOKEN_BYTES,
                actual: self.token_bytes,
            });
        }
        if self.token_lifetime.is_zero() {
            return Err(ConfigError::ZeroLifetime);
        }
        if self.field_name.trim().is_empty() {
            return Err(ConfigError::EmptyFieldName);
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognised flag value '{other}'"),
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_is_strict() {
        let config = CsrfConfig::default();
        assert!(config.single_use);
        assert_eq!(config.token_lifetime, Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_short_tokens() {
        let config = CsrfConfig {
            token_bytes: 8,
            ..CsrfConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TokenTooShort { min: 16, actual: 8 })
        );
    }

    #[test]
    fn rejects_zero_lifetime_and_blank_field() {
        let config = CsrfConfig::default().lifetime(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroLifetime));

        let config = CsrfConfig::default().field_name("  ");
        assert_eq!(config.validate(), Err(ConfigError::EmptyFieldName));
    }

    #[test]
    fn parses_flags() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(!parse_flag("off").unwrap());
        assert!(parse_flag("maybe").is_err());
    }
}
