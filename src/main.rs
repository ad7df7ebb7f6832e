//! # tweetkit
//!
//! A small HTTP service exposing a few Twitter/X API operations as JSON
//! endpoints, backed by the tweetkit facade and OAuth 1.0a credentials.
//!
//! ## Environment Variables
//!
//! - `TWITTER_CONSUMER_KEY`, `TWITTER_CONSUMER_SECRET`: application credentials
//! - `TWITTER_ACCESS_TOKEN_KEY`, `TWITTER_ACCESS_TOKEN_SECRET`: user credentials
//! - `TWITTER_ENCRYPTION_KEY`: optional, decrypts credentials stored as `enc:<hex>`
//! - `PORT`: Server port (defaults to 3000)
//!
//! ## API Endpoints
//!
//! - `GET /`: Returns a welcome message
//! - `GET /health`: Returns service health status
//! - `GET /tweets/:id`: Looks up a tweet
//! - `GET /users/:screen_name`: Looks up a user
//! - `GET /search/tweets?q=...`: Searches tweets
//! - `POST /statuses`: Posts a status update

use log::{error, info};
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use tweetkit::{build_router, get_server_port, TwitterClient, TwitterConfig};

/// Main entry point for the tweetkit web service.
///
/// The application uses the `env_logger` crate for logging. Log levels
/// can be controlled via the `RUST_LOG` environment variable.
///
/// ```bash
/// RUST_LOG=debug cargo run
/// ```
#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match TwitterConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load Twitter configuration: {}", e);
            std::process::exit(1);
        }
    };

    let client = match TwitterClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build Twitter client: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(client).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let port = get_server_port();
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    info!("Starting tweetkit server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("HTTP server error: {}", e);
    }
}
