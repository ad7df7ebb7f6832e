//! Authenticated transport for the Twitter API.
//!
//! The [`Transport`] trait is the seam every facade method and the media
//! upload sequencer talk through: a read verb and a write verb, each taking an
//! endpoint path and an options mapping and resolving to the JSON the service
//! returned. [`HttpTransport`] is the default implementation; it signs every
//! request with OAuth 1.0a and picks the body encoding the endpoint needs.

use async_trait::async_trait;
use log::{debug, error, info};
use reqwest::{multipart, Client, RequestBuilder};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

use crate::config::TwitterConfig;
use crate::oauth::{build_oauth1_header, percent_encode};

/// Errors raised while talking to the Twitter API.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid URL for '{path}': {message}")]
    InvalidUrl { path: String, message: String },
    #[error("parameter '{key}' cannot be sent in a {context}")]
    InvalidParam { key: String, context: &'static str },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Twitter API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// A single option value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// Plain text, sent as a query, form or multipart text field
    Text(String),
    /// Structured JSON, which forces a JSON request body
    Json(Value),
    /// Raw bytes, which force a multipart request body
    Binary(Vec<u8>),
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Text(value)
    }
}

impl From<&String> for Param {
    fn from(value: &String) -> Self {
        Param::Text(value.clone())
    }
}

impl From<u64> for Param {
    fn from(value: u64) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Text(value.to_string())
    }
}

impl From<Value> for Param {
    fn from(value: Value) -> Self {
        Param::Json(value)
    }
}

impl From<Vec<u8>> for Param {
    fn from(value: Vec<u8>) -> Self {
        Param::Binary(value)
    }
}

/// Open key/value mapping forwarded verbatim to the transport.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    params: BTreeMap<String, Param>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    ///
    /// ```rust
    /// use tweetkit::Options;
    ///
    /// let options = Options::new().with("id", "123").with("trim_user", true);
    /// assert_eq!(options.text("id"), Some("123"));
    /// ```
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Param>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Param>) -> Option<Param> {
        self.params.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Param> {
        self.params.get(key)
    }

    /// Returns the value for `key` when it is a text parameter.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.params.get(key) {
            Some(Param::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Param)> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn has_binary(&self) -> bool {
        self.params.values().any(|p| matches!(p, Param::Binary(_)))
    }

    pub fn has_json(&self) -> bool {
        self.params.values().any(|p| matches!(p, Param::Json(_)))
    }

    /// Flattens text parameters into pairs; any other kind is rejected.
    fn text_pairs(&self, context: &'static str) -> Result<Vec<(String, String)>, TransportError> {
        self.params
            .iter()
            .map(|(key, param)| match param {
                Param::Text(value) => Ok((key.clone(), value.clone())),
                _ => Err(TransportError::InvalidParam {
                    key: key.clone(),
                    context,
                }),
            })
            .collect()
    }

    /// Renders the options as a JSON object body.
    fn to_json_body(&self) -> Result<Value, TransportError> {
        let mut body = serde_json::Map::new();
        for (key, param) in &self.params {
            let value = match param {
                Param::Text(value) => Value::String(value.clone()),
                Param::Json(value) => value.clone(),
                Param::Binary(_) => {
                    return Err(TransportError::InvalidParam {
                        key: key.clone(),
                        context: "JSON body",
                    })
                }
            };
            body.insert(key.clone(), value);
        }
        Ok(Value::Object(body))
    }
}

impl<K, V> FromIterator<(K, V)> for Options
where
    K: Into<String>,
    V: Into<Param>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Options::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

/// Converts a JSON object into options: strings stay text, numbers and
/// booleans are rendered as text, everything else is kept as JSON.
impl From<serde_json::Map<String, Value>> for Options {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter()
            .map(|(key, value)| {
                let param = match value {
                    Value::String(s) => Param::Text(s),
                    Value::Number(n) => Param::Text(n.to_string()),
                    Value::Bool(b) => Param::Text(b.to_string()),
                    other => Param::Json(other),
                };
                (key, param)
            })
            .collect()
    }
}

/// Generic authenticated-request primitive with a read and a write verb.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a read (`GET`) against `path` with `options` as parameters.
    async fn get(&self, path: &str, options: &Options) -> Result<Value, TransportError>;

    /// Issues a write (`POST`) against `path` with `options` as parameters.
    async fn post(&self, path: &str, options: &Options) -> Result<Value, TransportError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Form,
    Json,
    Multipart,
}

fn body_kind(path: &str, options: &Options) -> BodyKind {
    if options.has_binary() {
        BodyKind::Multipart
    } else if options.has_json() || path.starts_with("direct_messages/events/") {
        BodyKind::Json
    } else {
        BodyKind::Form
    }
}

fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sanitizes text for safe logging by truncating and escaping control characters.
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    if sanitized.chars().count() > max_len {
        let truncated: String = sanitized.chars().take(max_len).collect();
        format!(
            "{}... [truncated, {} total bytes]",
            truncated,
            text.len()
        )
    } else {
        sanitized
    }
}

/// Pulls a human-readable message out of an error body.
///
/// Twitter answers errors with `{"errors":[{"code":..,"message":".."}]}`; the
/// first message is used, otherwise a sanitized snippet of the raw body.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("errors")
                .and_then(|errors| errors.get(0))
                .and_then(|first| first.get("message"))
                .and_then(|message| message.as_str())
                .map(|message| message.to_string())
        })
        .unwrap_or_else(|| sanitize_for_logging(body, 200))
}

/// Decodes a success body. An empty body (e.g. `204 No Content`) becomes `Null`.
fn decode_body(body: &str) -> Result<Value, TransportError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        TransportError::Decode(format!(
            "{}, body_snippet: {}",
            e,
            sanitize_for_logging(body, 200)
        ))
    })
}

/// The default [`Transport`], backed by `reqwest` and OAuth 1.0a signing.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: TwitterConfig,
}

impl HttpTransport {
    /// Builds the HTTP client, applying the configured timeout if any.
    pub fn new(config: TwitterConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(HttpTransport { client, config })
    }

    pub fn config(&self) -> &TwitterConfig {
        &self.config
    }

    /// Resolves `path` against the REST or upload base and appends `.json`.
    ///
    /// Only relative paths are accepted: an absolute or scheme-relative URL
    /// would replace the configured host and carry the signed header with it.
    pub fn endpoint_url(&self, path: &str) -> Result<Url, TransportError> {
        if path.starts_with("//") || Url::parse(path).is_ok() {
            return Err(TransportError::InvalidUrl {
                path: path.to_string(),
                message: "endpoint path must be relative to the configured base".to_string(),
            });
        }
        let path = path.trim_start_matches('/');
        let base = if path.starts_with("media/") {
            &self.config.upload_base
        } else {
            &self.config.api_base
        };
        let resource = if path.ends_with(".json") {
            path.to_string()
        } else {
            format!("{}.json", path)
        };

        Url::parse(base)
            .and_then(|base| base.join(&resource))
            .map_err(|e| TransportError::InvalidUrl {
                path: path.to_string(),
                message: e.to_string(),
            })
    }

    async fn send(
        &self,
        operation: &str,
        request_builder: RequestBuilder,
    ) -> Result<Value, TransportError> {
        info!("Making authenticated request for operation: {}", operation);

        let response = request_builder.send().await?;
        let status = response.status();
        info!(
            "Received response with status: {} for operation: {}",
            status, operation
        );

        let body = response.text().await?;
        if status.is_success() {
            debug!(
                "Response summary for '{}': {} bytes received",
                operation,
                body.len()
            );
            return decode_body(&body);
        }

        error!("Operation '{}' failed - Status: {}", operation, status);
        debug!(
            "Error response for '{}': {}",
            operation,
            sanitize_for_logging(&body, 200)
        );
        Err(TransportError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, options: &Options) -> Result<Value, TransportError> {
        let mut url = self.endpoint_url(path)?;
        let pairs = options.text_pairs("query string")?;

        let auth_header = build_oauth1_header(&self.config, "GET", url.as_str(), &pairs);
        if !pairs.is_empty() {
            url.set_query(Some(&encode_pairs(&pairs)));
        }

        debug!("Request URL: {}", url);
        debug!("Request headers: Authorization: OAuth [REDACTED]");

        let request_builder = self.client.get(url).header("Authorization", auth_header);
        self.send(&format!("GET {}", path), request_builder).await
    }

    async fn post(&self, path: &str, options: &Options) -> Result<Value, TransportError> {
        let url = self.endpoint_url(path)?;
        let kind = body_kind(path, options);
        debug!("Request URL: {} ({:?} body)", url, kind);
        debug!("Request headers: Authorization: OAuth [REDACTED]");

        let request_builder = match kind {
            BodyKind::Form => {
                let pairs = options.text_pairs("form body")?;
                let auth_header = build_oauth1_header(&self.config, "POST", url.as_str(), &pairs);
                self.client
                    .post(url)
                    .header("Authorization", auth_header)
                    .header("Content-Type", "application/x-www-form-urlencoded")
                    .body(encode_pairs(&pairs))
            }
            BodyKind::Json => {
                let payload = options.to_json_body()?;
                let auth_header = build_oauth1_header(&self.config, "POST", url.as_str(), &[]);
                self.client
                    .post(url)
                    .header("Authorization", auth_header)
                    .json(&payload)
            }
            BodyKind::Multipart => {
                let mut form = multipart::Form::new();
                for (key, param) in options.iter() {
                    form = match param {
                        Param::Text(value) => form.text(key.clone(), value.clone()),
                        Param::Json(value) => form.text(key.clone(), value.to_string()),
                        Param::Binary(bytes) => {
                            debug!("Multipart field '{}': {} bytes", key, bytes.len());
                            form.part(
                                key.clone(),
                                multipart::Part::bytes(bytes.clone()).file_name(key.clone()),
                            )
                        }
                    };
                }
                let auth_header = build_oauth1_header(&self.config, "POST", url.as_str(), &[]);
                self.client
                    .post(url)
                    .header("Authorization", auth_header)
                    .multipart(form)
            }
        };

        self.send(&format!("POST {}", path), request_builder).await
    }
}
