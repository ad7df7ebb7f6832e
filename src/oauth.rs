//! OAuth authentication module for Twitter/X API integration.
//!
//! This module implements OAuth 1.0a User Context request signing (HMAC-SHA1),
//! which the REST API v1.1 endpoints require for every call, including reads.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha1::Sha1;

use crate::config::TwitterConfig;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";
const NONCE_LENGTH: usize = 32;

/// Per-request values that make each OAuth signature unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthNonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl OAuthNonce {
    /// Generates a random alphanumeric nonce stamped with the current time.
    pub fn generate() -> Self {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(NONCE_LENGTH)
            .map(char::from)
            .collect();
        OAuthNonce {
            nonce,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Percent-encodes a string the way OAuth 1.0a requires (RFC 3986).
///
/// Only `A-Z a-z 0-9 - . _ ~` are left untouched; spaces become `%20`, never `+`.
///
/// # Example
///
/// ```rust
/// use tweetkit::oauth::percent_encode;
///
/// assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
/// ```
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Builds the OAuth 1.0a signature base string.
///
/// `base_url` must not carry a query string; `params` holds every query, form
/// and `oauth_*` parameter that takes part in the signature.
pub fn signature_base_string(method: &str, base_url: &str, params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    encoded.sort();

    let parameter_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(base_url),
        percent_encode(&parameter_string)
    )
}

/// Signs a base string with HMAC-SHA1 and returns the base64 signature.
pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> String {
    let signing_key = format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    );
    let mut mac = HmacSha1::new_from_slice(signing_key.as_bytes())
        .expect("HMAC-SHA1 accepts keys of any length");
    mac.update(base_string.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Builds the `Authorization` header value for a request, with a fresh nonce.
///
/// # Parameters
///
/// - `config`: The credentials to sign with
/// - `method`: HTTP method (`GET`, `POST`)
/// - `base_url`: Request URL without query string
/// - `request_params`: Query and form parameters that take part in the signature
///
/// # Returns
///
/// A header value of the form `OAuth oauth_consumer_key="...", ..., oauth_version="1.0"`.
pub fn build_oauth1_header(
    config: &TwitterConfig,
    method: &str,
    base_url: &str,
    request_params: &[(String, String)],
) -> String {
    build_oauth1_header_with(
        config,
        method,
        base_url,
        request_params,
        &OAuthNonce::generate(),
    )
}

/// Same as [`build_oauth1_header`] with a caller-supplied nonce and timestamp.
pub fn build_oauth1_header_with(
    config: &TwitterConfig,
    method: &str,
    base_url: &str,
    request_params: &[(String, String)],
    nonce: &OAuthNonce,
) -> String {
    let mut oauth_params: Vec<(String, String)> = vec![
        ("oauth_consumer_key".to_string(), config.consumer_key.clone()),
        ("oauth_nonce".to_string(), nonce.nonce.clone()),
        (
            "oauth_signature_method".to_string(),
            SIGNATURE_METHOD.to_string(),
        ),
        ("oauth_timestamp".to_string(), nonce.timestamp.to_string()),
        ("oauth_token".to_string(), config.access_token_key.clone()),
        ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
    ];

    let mut all_params = oauth_params.clone();
    all_params.extend(request_params.iter().cloned());

    let base_string = signature_base_string(method, base_url, &all_params);
    let signature = sign(
        &base_string,
        &config.consumer_secret,
        &config.access_token_secret,
    );

    oauth_params.push(("oauth_signature".to_string(), signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    format!("OAuth {}", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Values from Twitter's "Creating a signature" walkthrough.
    const URL: &str = "https://api.twitter.com/1.1/statuses/update.json";
    const STATUS: &str = "Hello Ladies + Gentlemen, a signed OAuth request!";

    fn doc_config() -> TwitterConfig {
        TwitterConfig::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        )
    }

    fn doc_nonce() -> OAuthNonce {
        OAuthNonce {
            nonce: "kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg".to_string(),
            timestamp: 1318622958,
        }
    }

    fn doc_request_params() -> Vec<(String, String)> {
        vec![
            ("status".to_string(), STATUS.to_string()),
            ("include_entities".to_string(), "true".to_string()),
        ]
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("Ladies + Gentlemen"), "Ladies%20%2B%20Gentlemen");
        assert_eq!(percent_encode("An encoded string!"), "An%20encoded%20string%21");
        assert_eq!(percent_encode("Dogs, Cats & Mice"), "Dogs%2C%20Cats%20%26%20Mice");
        assert_eq!(percent_encode("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(percent_encode("☃"), "%E2%98%83");
    }

    #[test]
    fn test_signature_base_string() {
        let config = doc_config();
        let nonce = doc_nonce();
        let mut params = vec![
            ("oauth_consumer_key".to_string(), config.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.nonce.clone()),
            ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
            ("oauth_timestamp".to_string(), nonce.timestamp.to_string()),
            ("oauth_token".to_string(), config.access_token_key.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];
        params.extend(doc_request_params());

        let expected = "POST&https%3A%2F%2Fapi.twitter.com%2F1.1%2Fstatuses%2Fupdate.json&include_entities%3Dtrue%26oauth_consumer_key%3Dxvz1evFS4wEEPTGEFPHBog%26oauth_nonce%3DkYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg%26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1318622958%26oauth_token%3D370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb%26oauth_version%3D1.0%26status%3DHello%2520Ladies%2520%252B%2520Gentlemen%252C%2520a%2520signed%2520OAuth%2520request%2521";
        assert_eq!(signature_base_string("post", URL, &params), expected);
    }

    #[test]
    fn test_header_matches_documented_signature() {
        let header = build_oauth1_header_with(
            &doc_config(),
            "POST",
            URL,
            &doc_request_params(),
            &doc_nonce(),
        );

        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"xvz1evFS4wEEPTGEFPHBog\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_timestamp=\"1318622958\""));
        assert!(header.contains("oauth_version=\"1.0\""));
        // hCtSmYh+iHYCEqBWrE7C7hYmtUk= once percent-encoded
        assert!(header.contains("oauth_signature=\"hCtSmYh%2BiHYCEqBWrE7C7hYmtUk%3D\""));
        // Request parameters are signed but never placed in the header
        assert!(!header.contains("status"));
    }

    #[test]
    fn test_generated_nonces_differ() {
        let a = OAuthNonce::generate();
        let b = OAuthNonce::generate();
        assert_eq!(a.nonce.len(), NONCE_LENGTH);
        assert!(a.nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a.nonce, b.nonce);
    }
}
