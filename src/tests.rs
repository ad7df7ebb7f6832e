//! # Tests Module
//!
//! Crate-level tests for the request facade, the media upload sequencer and
//! the HTTP endpoints. All of them run against a recording mock transport, so
//! no network access or credentials are needed.

use crate::{
    build_router, ApiResult, Options, Param, Transport, TransportError, TwitterClient,
    UploadError, UploadPhase, UploadRequest,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

/// A request seen by the mock transport.
#[derive(Debug, Clone, PartialEq)]
struct Call {
    verb: &'static str,
    path: String,
    options: Options,
}

/// Transport that records every call and answers from a scripted queue.
///
/// When the queue is empty it answers `{"echo": <path>}`.
struct MockTransport {
    calls: Arc<Mutex<Vec<Call>>>,
    responses: Mutex<VecDeque<Result<Value, TransportError>>>,
}

impl MockTransport {
    fn with_responses(responses: Vec<Result<Value, TransportError>>) -> Self {
        MockTransport {
            calls: Arc::new(Mutex::new(Vec::new())),
            responses: Mutex::new(responses.into()),
        }
    }

    fn record(&self, verb: &'static str, path: &str, options: &Options) -> ApiResult {
        self.calls.lock().unwrap().push(Call {
            verb,
            path: path.to_string(),
            options: options.clone(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"echo": path})))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, options: &Options) -> ApiResult {
        self.record("GET", path, options)
    }

    async fn post(&self, path: &str, options: &Options) -> ApiResult {
        self.record("POST", path, options)
    }
}

/// Builds a client over a mock and returns a handle on the recorded calls.
fn mock_client(responses: Vec<Result<Value, TransportError>>) -> (TwitterClient, Arc<Mutex<Vec<Call>>>) {
    let transport = MockTransport::with_responses(responses);
    let calls = transport.calls.clone();
    (TwitterClient::with_transport(transport), calls)
}

fn api_error(status: u16, message: &str) -> TransportError {
    TransportError::Api {
        status,
        message: message.to_string(),
    }
}

fn temp_media(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

const MEDIA_ID: &str = "710511363345354753";

fn init_response() -> Value {
    json!({
        "media_id": 710511363345354753u64,
        "media_id_string": MEDIA_ID,
        "expires_after_secs": 86400
    })
}

fn finalize_response() -> Value {
    json!({
        "media_id": 710511363345354753u64,
        "media_id_string": MEDIA_ID,
        "size": 11065,
        "image": {"image_type": "image/jpeg", "w": 800, "h": 320}
    })
}

async fn call_facade(client: &TwitterClient, method: &str, options: Options) -> ApiResult {
    match method {
        "get_retweeters" => client.get_retweeters(options).await,
        "get_retweets" => client.get_retweets(options).await,
        "show_tweet" => client.show_tweet(options).await,
        "show_user_tweets" => client.show_user_tweets(options).await,
        "search_tweets" => client.search_tweets(options).await,
        "search_users" => client.search_users(options).await,
        "show_user" => client.show_user(options).await,
        "post_status" => client.post_status(options).await,
        "send_message" => client.send_message(options).await,
        other => panic!("unknown facade method {}", other),
    }
}

/// Every facade method forwards its options unmodified to the fixed path and
/// verb, exactly once, and returns the transport's value unmodified.
#[tokio::test]
async fn test_facade_methods_are_pure_passthrough() {
    let table = [
        ("get_retweeters", "statuses/retweeters/ids", "GET"),
        ("get_retweets", "statuses/retweets", "GET"),
        ("show_tweet", "statuses/show", "GET"),
        ("show_user_tweets", "statuses/user_timeline", "GET"),
        ("search_tweets", "search/tweets", "GET"),
        ("search_users", "users/search", "GET"),
        ("show_user", "users/show", "GET"),
        ("post_status", "statuses/update", "POST"),
        ("send_message", "direct_messages/events/new", "POST"),
    ];

    for (method, path, verb) in table {
        let response = json!({"method": method, "nested": {"values": [1, 2, 3]}});
        let (client, calls) = mock_client(vec![Ok(response.clone())]);
        let options = Options::new()
            .with("id", "123")
            .with("count", 5u64)
            .with("event", json!({"type": "message_create"}));

        let result = call_facade(&client, method, options.clone()).await.unwrap();
        assert_eq!(result, response, "{} altered the response", method);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1, "{} should issue exactly one call", method);
        assert_eq!(
            calls[0],
            Call {
                verb,
                path: path.to_string(),
                options,
            },
            "{} forwarded the wrong request",
            method
        );
    }
}

#[tokio::test]
async fn test_show_tweet_forwards_id() {
    let tweet = json!({"id_str": "123", "text": "hello"});
    let (client, calls) = mock_client(vec![Ok(tweet.clone())]);

    let result = client
        .show_tweet(Options::new().with("id", "123"))
        .await
        .unwrap();

    assert_eq!(result, tweet);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].verb, "GET");
    assert_eq!(calls[0].path, "statuses/show");
    assert_eq!(calls[0].options, Options::new().with("id", "123"));
}

#[tokio::test]
async fn test_facade_propagates_transport_errors() {
    let (client, _calls) = mock_client(vec![Err(api_error(404, "No status found"))]);

    let err = client
        .show_tweet(Options::new().with("id", "1"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TransportError::Api { status: 404, ref message } if message == "No status found"
    ));
}

#[tokio::test]
async fn test_generic_execute_primitives() {
    let (client, calls) = mock_client(vec![]);

    let read = client
        .execute("friends/ids", Options::new().with("screen_name", "rustlang"))
        .await
        .unwrap();
    let write = client
        .execute_post("favorites/create", Options::new().with("id", "9"))
        .await
        .unwrap();

    assert_eq!(read, json!({"echo": "friends/ids"}));
    assert_eq!(write, json!({"echo": "favorites/create"}));
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].verb, "GET");
    assert_eq!(calls[1].verb, "POST");
}

/// INIT, APPEND and FINALIZE are issued in order, all sharing the INIT media id.
#[tokio::test]
async fn test_upload_photo_runs_three_phases_in_order() {
    let bytes: Vec<u8> = (0..1024u32).map(|i| (i % 251) as u8).collect();
    let file = temp_media(&bytes);
    let (client, calls) = mock_client(vec![
        Ok(init_response()),
        Ok(Value::Null),
        Ok(finalize_response()),
    ]);

    let result = client
        .upload_photo(&UploadRequest::new(file.path(), "image/jpeg"))
        .await
        .unwrap();
    assert_eq!(result, finalize_response());

    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    for call in calls.iter() {
        assert_eq!(call.verb, "POST");
        assert_eq!(call.path, "media/upload");
    }

    let commands: Vec<_> = calls.iter().map(|c| c.options.text("command")).collect();
    assert_eq!(
        commands,
        vec![Some("INIT"), Some("APPEND"), Some("FINALIZE")]
    );

    let init = &calls[0].options;
    assert_eq!(init.text("total_bytes"), Some("1024"));
    assert_eq!(init.text("media_type"), Some("image/jpeg"));
    assert_eq!(init.get("media_id"), None);

    let append = &calls[1].options;
    assert_eq!(append.text("media_id"), Some(MEDIA_ID));
    assert_eq!(append.text("segment_index"), Some("0"));
    assert_eq!(append.get("media"), Some(&Param::Binary(bytes.clone())));

    let finalize = &calls[2].options;
    assert_eq!(finalize.text("media_id"), Some(MEDIA_ID));
    assert_eq!(finalize.get("media"), None);
}

/// A file larger than a typical chunk size is still sent as one segment.
#[tokio::test]
async fn test_upload_photo_uses_single_segment_for_large_files() {
    let bytes = vec![7u8; 6 * 1024 * 1024];
    let file = temp_media(&bytes);
    let (client, calls) = mock_client(vec![
        Ok(json!({"media_id": 42})),
        Ok(Value::Null),
        Ok(json!({"media_id_string": "42"})),
    ]);

    client
        .upload_photo(&UploadRequest::new(file.path(), "image/png"))
        .await
        .unwrap();

    let calls = calls.lock().unwrap();
    let appends: Vec<_> = calls
        .iter()
        .filter(|c| c.options.text("command") == Some("APPEND"))
        .collect();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].options.text("segment_index"), Some("0"));
    assert_eq!(appends[0].options.text("media_id"), Some("42"));
    assert_eq!(
        calls[0].options.text("total_bytes"),
        Some((6 * 1024 * 1024).to_string().as_str())
    );
}

#[tokio::test]
async fn test_upload_photo_without_media_id_stops_after_init() {
    let file = temp_media(b"jpeg bytes");
    let (client, calls) = mock_client(vec![Ok(json!({"expires_after_secs": 86400}))]);

    let err = client
        .upload_photo(&UploadRequest::new(file.path(), "image/jpeg"))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::MissingMediaId { .. }));
    assert_eq!(err.phase(), Some(UploadPhase::Init));
    assert_eq!(calls.lock().unwrap().len(), 1);
}

/// A rejected call ends the sequence and the error names the failing phase.
#[tokio::test]
async fn test_upload_photo_short_circuits_on_failure() {
    let cases = vec![
        (
            vec![Err(api_error(401, "Could not authenticate you"))],
            UploadPhase::Init,
            1,
        ),
        (
            vec![Ok(init_response()), Err(api_error(400, "Segments do not add up"))],
            UploadPhase::Append,
            2,
        ),
        (
            vec![
                Ok(init_response()),
                Ok(Value::Null),
                Err(api_error(400, "Invalid media")),
            ],
            UploadPhase::Finalize,
            3,
        ),
    ];

    for (responses, failing_phase, expected_calls) in cases {
        let file = temp_media(b"jpeg bytes");
        let (client, calls) = mock_client(responses);

        let err = client
            .upload_photo(&UploadRequest::new(file.path(), "image/jpeg"))
            .await
            .unwrap_err();

        assert_eq!(err.phase(), Some(failing_phase));
        assert!(matches!(
            err,
            UploadError::Phase {
                source: TransportError::Api { .. },
                ..
            }
        ));
        assert_eq!(
            calls.lock().unwrap().len(),
            expected_calls,
            "{} failure should stop the sequence",
            failing_phase
        );
    }
}

#[tokio::test]
async fn test_upload_photo_missing_file_sends_nothing() {
    let (client, calls) = mock_client(vec![]);

    let err = client
        .upload_photo(&UploadRequest::new(
            "/nonexistent/tweetkit/photo.jpg",
            "image/jpeg",
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Read { .. }));
    assert_eq!(err.phase(), None);
    assert!(calls.lock().unwrap().is_empty());
}

/// Independent clients share no state.
#[tokio::test]
async fn test_concurrent_uploads_are_independent() {
    let file_a = temp_media(b"first image");
    let file_b = temp_media(b"second, longer image");
    let (client_a, calls_a) = mock_client(vec![
        Ok(json!({"media_id_string": "1"})),
        Ok(Value::Null),
        Ok(json!({"media_id_string": "1"})),
    ]);
    let (client_b, calls_b) = mock_client(vec![
        Ok(json!({"media_id_string": "2"})),
        Ok(Value::Null),
        Ok(json!({"media_id_string": "2"})),
    ]);

    let request_a = UploadRequest::new(file_a.path(), "image/jpeg");
    let request_b = UploadRequest::new(file_b.path(), "image/gif");
    let (a, b) = tokio::join!(
        client_a.upload_photo(&request_a),
        client_b.upload_photo(&request_b)
    );

    assert_eq!(a.unwrap(), json!({"media_id_string": "1"}));
    assert_eq!(b.unwrap(), json!({"media_id_string": "2"}));
    for call in calls_a.lock().unwrap().iter().skip(1) {
        assert_eq!(call.options.text("media_id"), Some("1"));
    }
    for call in calls_b.lock().unwrap().iter().skip(1) {
        assert_eq!(call.options.text("media_id"), Some("2"));
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

/// Integration test for the root endpoint (GET /).
#[tokio::test]
async fn test_root_endpoint() {
    let (client, _calls) = mock_client(vec![]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(String::from_utf8(body.to_vec()).unwrap(), "tweetkit is running");
}

/// Integration test for the health endpoint (GET /health).
#[tokio::test]
async fn test_health_endpoint() {
    let (client, _calls) = mock_client(vec![]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/health")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["status"], "healthy");
    assert_eq!(json_response["service"], "tweetkit");
}

#[tokio::test]
async fn test_show_tweet_endpoint() {
    let tweet = json!({"id_str": "20", "text": "just setting up my twttr"});
    let (client, calls) = mock_client(vec![Ok(tweet.clone())]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/tweets/20")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["status"], "success");
    assert_eq!(json_response["response"], tweet);

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].path, "statuses/show");
    assert_eq!(calls[0].options, Options::new().with("id", "20"));
}

#[tokio::test]
async fn test_show_user_endpoint() {
    let (client, calls) = mock_client(vec![Ok(json!({"screen_name": "jack"}))]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/users/jack")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].path, "users/show");
    assert_eq!(calls[0].options.text("screen_name"), Some("jack"));
}

#[tokio::test]
async fn test_search_endpoint_forwards_query() {
    let (client, calls) = mock_client(vec![Ok(json!({"statuses": []}))]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/search/tweets?q=rust%20lang&count=10")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].path, "search/tweets");
    assert_eq!(
        calls[0].options,
        Options::new().with("q", "rust lang").with("count", "10")
    );
}

#[tokio::test]
async fn test_search_endpoint_requires_query() {
    let (client, calls) = mock_client(vec![]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/search/tweets")
        .method("GET")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_post_status_endpoint() {
    let posted = json!({"id_str": "1", "text": "Hello world"});
    let (client, calls) = mock_client(vec![Ok(posted.clone())]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/statuses")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({"status": "Hello world", "media_ids": MEDIA_ID}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json_response = body_json(response).await;
    assert_eq!(json_response["status"], "success");
    assert_eq!(json_response["response"], posted);

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].verb, "POST");
    assert_eq!(calls[0].path, "statuses/update");
    assert_eq!(
        calls[0].options,
        Options::new()
            .with("status", "Hello world")
            .with("media_ids", MEDIA_ID)
    );
}

/// A transport failure surfaces as a 500 with the error message.
#[tokio::test]
async fn test_post_status_endpoint_reports_errors() {
    let (client, _calls) = mock_client(vec![Err(api_error(403, "Status is a duplicate."))]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/statuses")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"status": "again"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json_response = body_json(response).await;
    assert_eq!(json_response["status"], "error");
    assert_eq!(json_response["message"], "Failed to post status");
    assert!(json_response["error"]
        .as_str()
        .unwrap()
        .contains("Status is a duplicate."));
}

#[tokio::test]
async fn test_post_status_endpoint_requires_status() {
    let (client, calls) = mock_client(vec![]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/statuses")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(json!({"media_ids": "1"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(calls.lock().unwrap().is_empty());
}

/// A list of media ids is joined into the comma-separated form field.
#[tokio::test]
async fn test_post_status_endpoint_joins_media_id_lists() {
    let (client, calls) = mock_client(vec![Ok(json!({"id_str": "2"}))]);
    let app = build_router(client);

    let request = Request::builder()
        .uri("/statuses")
        .method("POST")
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({"status": "two photos", "media_ids": ["1", 2], "trim_user": true}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].path, "statuses/update");
    assert_eq!(
        calls[0].options.get("media_ids"),
        Some(&Param::Text("1,2".to_string()))
    );
    assert_eq!(
        calls[0].options,
        Options::new()
            .with("status", "two photos")
            .with("media_ids", "1,2")
            .with("trim_user", "true")
    );
    assert!(!calls[0].options.has_json());
}

#[tokio::test]
async fn test_post_status_endpoint_rejects_structured_fields() {
    for body in [
        json!({"status": "hi", "place": {"id": "df51dec6f4ee2b2c"}}),
        json!({"status": "hi", "media_ids": [["1"]]}),
        json!({"status": "hi", "in_reply_to_status_id": null}),
    ] {
        let (client, calls) = mock_client(vec![]);
        let app = build_router(client);

        let request = Request::builder()
            .uri("/statuses")
            .method("POST")
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", body);

        let json_response = body_json(response).await;
        assert_eq!(json_response["status"], "error");
        assert!(calls.lock().unwrap().is_empty());
    }
}

/// Unit test for the get_server_port function.
#[test]
fn test_get_server_port() {
    std::env::remove_var("PORT");
    assert_eq!(crate::get_server_port(), 3000);

    std::env::set_var("PORT", "8080");
    assert_eq!(crate::get_server_port(), 8080);

    std::env::remove_var("PORT");
}
