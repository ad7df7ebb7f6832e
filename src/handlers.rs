//! HTTP route handlers for the tweetkit service.
//!
//! This module exposes a handful of facade operations as JSON endpoints. Each
//! handler shapes the request into [`Options`], calls the shared
//! [`TwitterClient`] and wraps the passthrough response.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use log::{error, info};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::client::{ApiResult, TwitterClient};
use crate::transport::{Options, TransportError};

type HandlerResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

/// Builds the application router with all routes bound to `client`.
pub fn build_router(client: TwitterClient) -> Router {
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/tweets/:id", get(handle_show_tweet))
        .route("/users/:screen_name", get(handle_show_user))
        .route("/search/tweets", get(handle_search_tweets))
        .route("/statuses", post(handle_post_status))
        .with_state(client)
}

/// Handles GET requests to the root endpoint.
pub async fn handle_root() -> &'static str {
    "tweetkit is running"
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "tweetkit"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "tweetkit"}))
}

/// Handles `GET /tweets/:id` by looking the tweet up.
pub async fn handle_show_tweet(
    State(client): State<TwitterClient>,
    Path(id): Path<String>,
) -> HandlerResult {
    info!("Looking up tweet {}", id);
    respond(
        "Failed to fetch tweet",
        client.show_tweet(Options::new().with("id", id)).await,
    )
}

/// Handles `GET /users/:screen_name` by looking the user up.
pub async fn handle_show_user(
    State(client): State<TwitterClient>,
    Path(screen_name): Path<String>,
) -> HandlerResult {
    info!("Looking up user @{}", screen_name);
    respond(
        "Failed to fetch user",
        client
            .show_user(Options::new().with("screen_name", screen_name))
            .await,
    )
}

/// Handles `GET /search/tweets`; every query parameter is forwarded as is.
pub async fn handle_search_tweets(
    State(client): State<TwitterClient>,
    Query(params): Query<HashMap<String, String>>,
) -> HandlerResult {
    if !params.contains_key("q") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "Missing query parameter 'q'"})),
        ));
    }
    info!("Searching tweets with {} parameter(s)", params.len());
    respond(
        "Failed to search tweets",
        client.search_tweets(params.into_iter().collect()).await,
    )
}

/// Handles `POST /statuses`; the JSON object body becomes the update options.
///
/// # Success Response
///
/// ```json
/// {
///   "status": "success",
///   "message": "Status posted",
///   "response": { "id_str": "..." }
/// }
/// ```
pub async fn handle_post_status(
    State(client): State<TwitterClient>,
    Json(body): Json<Map<String, Value>>,
) -> HandlerResult {
    if !body.contains_key("status") {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "Missing field 'status'"})),
        ));
    }
    let options = match status_options(body) {
        Ok(options) => options,
        Err(message) => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"status": "error", "message": message})),
            ))
        }
    };
    match client.post_status(options).await {
        Ok(response) => {
            info!("Status posted successfully");
            Ok(Json(
                json!({"status": "success", "message": "Status posted", "response": response}),
            ))
        }
        Err(e) => Err(failure("Failed to post status", e)),
    }
}

/// Flattens a status update body into form parameters.
///
/// `statuses/update` only reads form fields, so every value must become text:
/// scalars are rendered as is and arrays of scalars (e.g. `media_ids`) are
/// joined with commas. Objects, nulls and nested arrays are rejected.
fn status_options(body: Map<String, Value>) -> Result<Options, String> {
    let mut options = Options::new();
    for (key, value) in body {
        let text = match value {
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    scalar_text(item)
                        .ok_or_else(|| format!("Field '{}' may only list strings or numbers", key))
                })
                .collect::<Result<Vec<_>, _>>()?
                .join(","),
            other => scalar_text(&other)
                .ok_or_else(|| format!("Field '{}' must be a string, number, boolean or list", key))?,
        };
        options.insert(key, text);
    }
    Ok(options)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn respond(context: &str, result: ApiResult) -> HandlerResult {
    match result {
        Ok(response) => Ok(Json(json!({"status": "success", "response": response}))),
        Err(e) => Err(failure(context, e)),
    }
}

fn failure(context: &str, e: TransportError) -> (StatusCode, Json<Value>) {
    error!("{}: {}", context, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"status": "error", "message": context, "error": e.to_string()})),
    )
}
