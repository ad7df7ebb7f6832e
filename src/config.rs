//! Configuration module for tweetkit.
//!
//! This module contains the configuration structure holding the OAuth 1.0a
//! credentials and endpoint bases for the Twitter/X REST API, plus environment
//! variable handling for the HTTP service.

use log::{debug, error, info, warn};
use std::env;
use std::time::Duration;
use url::Url;

use crate::crypto::{decrypt_with_key, is_encrypted, parse_encryption_key, ENCRYPTION_KEY_VAR};

/// Default base URL for REST API v1.1 endpoints.
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1/";

/// Default base URL for media upload endpoints.
pub const DEFAULT_UPLOAD_BASE: &str = "https://upload.twitter.com/1.1/";

const CONSUMER_KEY_VAR: &str = "TWITTER_CONSUMER_KEY";
const CONSUMER_SECRET_VAR: &str = "TWITTER_CONSUMER_SECRET";
const ACCESS_TOKEN_KEY_VAR: &str = "TWITTER_ACCESS_TOKEN_KEY";
const ACCESS_TOKEN_SECRET_VAR: &str = "TWITTER_ACCESS_TOKEN_SECRET";
const API_BASE_VAR: &str = "TWITTER_API_BASE";
const UPLOAD_BASE_VAR: &str = "TWITTER_UPLOAD_BASE";
const TIMEOUT_VAR: &str = "TWITTER_TIMEOUT_SECS";

/// Configuration struct for Twitter/X API credentials.
///
/// Holds the four OAuth 1.0a User Context credentials. They are supplied once
/// when a client is constructed and reused for every request; there is no
/// runtime reconfiguration.
#[derive(Clone)]
pub struct TwitterConfig {
    /// The application's consumer (API) key
    pub consumer_key: String,
    /// The application's consumer (API) secret
    pub consumer_secret: String,
    /// The user's access token
    pub access_token_key: String,
    /// The user's access token secret
    pub access_token_secret: String,
    /// Base URL for REST endpoints, ending with `/`
    pub api_base: String,
    /// Base URL for `media/*` endpoints, ending with `/`
    pub upload_base: String,
    /// Optional per-request timeout applied by the HTTP transport
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for TwitterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterConfig")
            .field("consumer_key", &mask_secret(&self.consumer_key))
            .field("consumer_secret", &"[REDACTED]")
            .field("access_token_key", &mask_secret(&self.access_token_key))
            .field("access_token_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("upload_base", &self.upload_base)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TwitterConfig {
    /// Creates a configuration from the four credential strings, using the
    /// default endpoint bases.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tweetkit::TwitterConfig;
    ///
    /// let config = TwitterConfig::new("ck", "cs", "atk", "ats");
    /// assert_eq!(config.api_base, "https://api.twitter.com/1.1/");
    /// ```
    pub fn new(
        consumer_key: impl Into<String>,
        consumer_secret: impl Into<String>,
        access_token_key: impl Into<String>,
        access_token_secret: impl Into<String>,
    ) -> Self {
        TwitterConfig {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token_key: access_token_key.into(),
            access_token_secret: access_token_secret.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            timeout: None,
        }
    }

    /// Overrides both endpoint bases. A trailing `/` is added when missing.
    pub fn with_base_urls(mut self, api_base: &str, upload_base: &str) -> Self {
        self.api_base = with_trailing_slash(api_base);
        self.upload_base = with_trailing_slash(upload_base);
        self
    }

    /// Sets the per-request timeout used by the HTTP transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Loads the Twitter configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `TWITTER_CONSUMER_KEY`
    /// - `TWITTER_CONSUMER_SECRET`
    /// - `TWITTER_ACCESS_TOKEN_KEY`
    /// - `TWITTER_ACCESS_TOKEN_SECRET`
    ///
    /// Optional:
    /// - `TWITTER_API_BASE`, `TWITTER_UPLOAD_BASE`: endpoint overrides
    /// - `TWITTER_TIMEOUT_SECS`: request timeout in seconds
    /// - `TWITTER_ENCRYPTION_KEY`: key for credentials stored as `enc:<hex>`
    ///
    /// # Returns
    ///
    /// - `Ok(TwitterConfig)`: If all required credentials are present and valid
    /// - `Err(Box<dyn std::error::Error + Send + Sync>)`: If a credential is missing,
    ///   empty, or cannot be decrypted
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        info!("Loading Twitter configuration from environment variables");
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads the configuration through an arbitrary variable lookup.
    ///
    /// This is what [`TwitterConfig::from_env`] uses; tests pass a closure over
    /// a map instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error + Send + Sync>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let encryption_key = match lookup(ENCRYPTION_KEY_VAR) {
            Some(key_hex) => {
                debug!("Found {} for encrypted credentials", ENCRYPTION_KEY_VAR);
                Some(parse_encryption_key(&key_hex)?)
            }
            None => None,
        };

        let load = |name: &str| -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            let raw = match lookup(name) {
                Some(value) => value,
                None => {
                    error!("Failed to load {} from environment", name);
                    return Err(format!("Missing {} environment variable", name).into());
                }
            };

            let value = if is_encrypted(&raw) {
                let key = encryption_key.as_ref().ok_or_else(|| {
                    format!(
                        "{} is encrypted but {} is not set",
                        name, ENCRYPTION_KEY_VAR
                    )
                })?;
                decrypt_with_key(key, &raw)
                    .map_err(|e| format!("Failed to decrypt {}: {}", name, e))?
            } else {
                raw
            };

            let value = value.trim().to_string();
            if value.is_empty() {
                error!("{} is empty", name);
                return Err(format!("{} cannot be empty", name).into());
            }

            if value.len() < 10 {
                warn!(
                    "{} seems unusually short ({} characters)",
                    name,
                    value.len()
                );
            }

            debug!("{} (masked): {}", name, mask_secret(&value));
            Ok(value)
        };

        let mut config = TwitterConfig::new(
            load(CONSUMER_KEY_VAR)?,
            load(CONSUMER_SECRET_VAR)?,
            load(ACCESS_TOKEN_KEY_VAR)?,
            load(ACCESS_TOKEN_SECRET_VAR)?,
        );

        if let Some(api_base) = lookup(API_BASE_VAR) {
            info!("Using API base override: {}", api_base);
            config.api_base = parse_base_url(API_BASE_VAR, &api_base)?;
        }
        if let Some(upload_base) = lookup(UPLOAD_BASE_VAR) {
            info!("Using upload base override: {}", upload_base);
            config.upload_base = parse_base_url(UPLOAD_BASE_VAR, &upload_base)?;
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|e| format!("{} must be a whole number of seconds: {}", TIMEOUT_VAR, e))?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        info!("Twitter configuration loaded successfully");
        Ok(config)
    }
}

/// Checks an endpoint base override so a bad value fails at startup.
fn parse_base_url(name: &str, raw: &str) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
    let base = with_trailing_slash(raw.trim());
    match Url::parse(&base) {
        Ok(url) if !url.cannot_be_a_base() => Ok(base),
        Ok(_) => Err(format!("{} must be an http(s) base URL, got '{}'", name, raw).into()),
        Err(e) => {
            error!("Invalid {}: {}", name, e);
            Err(format!("{} is not a valid URL: {}", name, e).into())
        }
    }
}

fn with_trailing_slash(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    }
}

/// Masks a secret for logging, keeping at most the first and last four characters.
pub(crate) fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 16 {
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else if chars.len() > 8 {
        let prefix: String = chars[..4].iter().collect();
        format!("{}...", prefix)
    } else {
        "...".to_string()
    }
}

/// Gets the server port from environment variables or returns the default.
///
/// This function reads the `PORT` environment variable and parses it as a u16.
/// If the environment variable is not set, it defaults to 3000.
///
/// # Panics
///
/// This function will panic if the `PORT` environment variable is set to a value
/// that cannot be parsed as a valid port number.
///
/// # Example
///
/// ```rust
/// use tweetkit::get_server_port;
///
/// // With no PORT set
/// let port = get_server_port(); // Returns 3000
/// ```
pub fn get_server_port() -> u16 {
    env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse()
        .expect("PORT must be a valid number")
}
