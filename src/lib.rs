//! # tweetkit
//!
//! A thin convenience wrapper around the Twitter/X REST API v1.1. Each facade
//! method maps one semantic operation onto a single authenticated HTTP call;
//! photo uploads run the three-step `media/upload` sequence.
//!
//! ## Features
//!
//! - OAuth 1.0a User Context request signing (HMAC-SHA1)
//! - Request facade: retweeters, retweets, tweet lookup, user timeline,
//!   tweet and user search, user lookup, status update, direct messages
//! - Media upload sequencer (INIT, APPEND, FINALIZE) with phase-tagged errors
//! - Pluggable [`Transport`] so the facade can be driven by a mock
//! - Optional HTTP service exposing a few operations as JSON endpoints
//!
//! ## Configuration
//!
//! Credentials are passed explicitly through [`TwitterConfig`], or loaded from
//! `TWITTER_CONSUMER_KEY`, `TWITTER_CONSUMER_SECRET`, `TWITTER_ACCESS_TOKEN_KEY`
//! and `TWITTER_ACCESS_TOKEN_SECRET` with [`TwitterConfig::from_env`].

pub mod client;
pub mod config;
pub mod crypto;
pub mod handlers;
pub mod media;
pub mod oauth;
pub mod transport;

// Re-export commonly used types and functions
pub use client::{ApiResult, TwitterClient};
pub use config::{get_server_port, TwitterConfig};
pub use handlers::build_router;
pub use media::{upload_media, UploadError, UploadPhase, UploadRequest};
pub use transport::{HttpTransport, Options, Param, Transport, TransportError};

#[cfg(test)]
mod tests;
