//! Twitter/X API facade.
//!
//! [`TwitterClient`] exposes one named method per supported endpoint. Every
//! method forwards its options untouched to [`TwitterClient::execute`] (read)
//! or [`TwitterClient::execute_post`] (write) and hands back whatever the
//! transport resolved with. The only exception is [`TwitterClient::upload_photo`],
//! which drives the three-step media upload.

use log::debug;
use serde_json::Value;
use std::sync::Arc;

use crate::config::TwitterConfig;
use crate::media::{upload_media, UploadError, UploadRequest};
use crate::transport::{HttpTransport, Options, Transport, TransportError};

pub const RETWEETERS_PATH: &str = "statuses/retweeters/ids";
pub const RETWEETS_PATH: &str = "statuses/retweets";
pub const SHOW_TWEET_PATH: &str = "statuses/show";
pub const USER_TIMELINE_PATH: &str = "statuses/user_timeline";
pub const SEARCH_TWEETS_PATH: &str = "search/tweets";
pub const SEARCH_USERS_PATH: &str = "users/search";
pub const SHOW_USER_PATH: &str = "users/show";
pub const UPDATE_STATUS_PATH: &str = "statuses/update";
pub const SEND_MESSAGE_PATH: &str = "direct_messages/events/new";

/// Result type of every facade method.
pub type ApiResult = Result<Value, TransportError>;

/// Facade over a [`Transport`].
///
/// Cloning is cheap; clones share the same transport and credentials. Separate
/// clients built from separate configurations are fully independent.
#[derive(Clone)]
pub struct TwitterClient {
    transport: Arc<dyn Transport>,
}

impl TwitterClient {
    /// Builds a client that talks to Twitter over HTTP with the given credentials.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use tweetkit::{Options, TwitterClient, TwitterConfig};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let config = TwitterConfig::new("ck", "cs", "atk", "ats");
    ///     let client = TwitterClient::new(config).unwrap();
    ///     match client.show_tweet(Options::new().with("id", "20")).await {
    ///         Ok(tweet) => println!("{}", tweet["text"]),
    ///         Err(e) => eprintln!("Lookup failed: {}", e),
    ///     }
    /// }
    /// ```
    pub fn new(config: TwitterConfig) -> Result<Self, TransportError> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// Builds a client over any transport, e.g. a recording mock in tests.
    pub fn with_transport<T: Transport + 'static>(transport: T) -> Self {
        TwitterClient {
            transport: Arc::new(transport),
        }
    }

    /// Generic read primitive.
    pub async fn execute(&self, path: &str, options: Options) -> ApiResult {
        debug!("execute GET {} with {} option(s)", path, options.len());
        self.transport.get(path, &options).await
    }

    /// Generic write primitive.
    pub async fn execute_post(&self, path: &str, options: Options) -> ApiResult {
        debug!("execute POST {} with {} option(s)", path, options.len());
        self.transport.post(path, &options).await
    }

    /// Ids of users who retweeted a tweet (`id` required).
    pub async fn get_retweeters(&self, options: Options) -> ApiResult {
        self.execute(RETWEETERS_PATH, options).await
    }

    /// Most recent retweets of a tweet (`id` required).
    pub async fn get_retweets(&self, options: Options) -> ApiResult {
        self.execute(RETWEETS_PATH, options).await
    }

    /// A single tweet (`id` required).
    pub async fn show_tweet(&self, options: Options) -> ApiResult {
        self.execute(SHOW_TWEET_PATH, options).await
    }

    /// A user's timeline (`user_id` or `screen_name`).
    pub async fn show_user_tweets(&self, options: Options) -> ApiResult {
        self.execute(USER_TIMELINE_PATH, options).await
    }

    /// Standard tweet search (`q` required).
    pub async fn search_tweets(&self, options: Options) -> ApiResult {
        self.execute(SEARCH_TWEETS_PATH, options).await
    }

    /// User search (`q` required).
    pub async fn search_users(&self, options: Options) -> ApiResult {
        self.execute(SEARCH_USERS_PATH, options).await
    }

    /// A single user (`user_id` or `screen_name`).
    pub async fn show_user(&self, options: Options) -> ApiResult {
        self.execute(SHOW_USER_PATH, options).await
    }

    /// Posts a status update (`status` required, `media_ids` to attach uploads).
    pub async fn post_status(&self, options: Options) -> ApiResult {
        self.execute_post(UPDATE_STATUS_PATH, options).await
    }

    /// Sends a direct message; `event` carries the message_create object.
    pub async fn send_message(&self, options: Options) -> ApiResult {
        self.execute_post(SEND_MESSAGE_PATH, options).await
    }

    /// Uploads a photo and returns the FINALIZE response.
    pub async fn upload_photo(&self, request: &UploadRequest) -> Result<Value, UploadError> {
        upload_media(self.transport.as_ref(), request).await
    }
}
