//! Twitter Tweet Posting Script
//!
//! Posts a status update with the credentials from the environment, optionally
//! attaching a photo uploaded through the media upload sequence.
//!
//! Usage:
//!
//! ```bash
//! post_tweet "Hello from Rust!"
//! post_tweet "Look at this" ./photo.jpg image/jpeg
//! ```

use std::io::{self, Write};

use tweetkit::media::extract_media_id;
use tweetkit::{Options, TwitterClient, TwitterConfig, UploadRequest};

/// Guesses a MIME type from the file extension when none is given.
fn guess_media_type(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".png") {
        "image/png"
    } else if lower.ends_with(".gif") {
        "image/gif"
    } else if lower.ends_with(".webp") {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    println!("🐦 Twitter Tweet Posting Tool");
    println!("==============================");

    let mut args = std::env::args().skip(1);

    let tweet_text = match args.next() {
        Some(text) => text,
        None => {
            print!("📝 Enter your tweet message: ");
            io::stdout().flush()?;
            let mut text = String::new();
            io::stdin().read_line(&mut text)?;
            text
        }
    };
    let tweet_text = tweet_text.trim().to_string();

    if tweet_text.is_empty() {
        println!("❌ Tweet message cannot be empty!");
        return Err("Tweet message is required".into());
    }

    // Validate tweet length (Twitter's limit is 280 characters)
    if tweet_text.chars().count() > 280 {
        println!(
            "❌ Tweet is too long! {} characters (max 280)",
            tweet_text.chars().count()
        );
        return Err("Tweet exceeds 280 character limit".into());
    }

    println!("📏 Tweet length: {} characters", tweet_text.chars().count());

    let config = TwitterConfig::from_env()?;
    let client = TwitterClient::new(config)?;

    let mut options = Options::new().with("status", tweet_text.as_str());

    if let Some(photo) = args.next() {
        let media_type = args
            .next()
            .unwrap_or_else(|| guess_media_type(&photo).to_string());
        println!("🖼️  Uploading {} ({})", photo, media_type);

        let finalized = match client
            .upload_photo(&UploadRequest::new(&photo, media_type))
            .await
        {
            Ok(finalized) => finalized,
            Err(e) => {
                println!("\n💥 Photo upload failed: {}", e);
                return Err(e.into());
            }
        };

        let media_id =
            extract_media_id(&finalized).ok_or("FINALIZE response did not contain a media id")?;
        println!("✅ Photo uploaded as media {}", media_id);
        options.insert("media_ids", media_id);
    }

    println!("\n🚀 Posting your tweet...");
    match client.post_status(options).await {
        Ok(response) => {
            println!("\n🎉 Success! Your tweet has been posted.");
            if let Some(id) = response.get("id_str").and_then(|v| v.as_str()) {
                println!("🔗 Tweet id: {}", id);
            }
        }
        Err(e) => {
            println!("\n💥 Failed to post tweet: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
