//! Credential Encryption Utility
//!
//! Encrypts a Twitter credential with AES-256-GCM so it can be stored in the
//! environment as `enc:<hex>`. Requires TWITTER_ENCRYPTION_KEY to be set.

use std::io::{self, Write};

use tweetkit::crypto::{encrypt_credential, ENCRYPTION_KEY_VAR};

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    println!("🔐 Credential Encryption Utility");
    println!("================================");
    println!();

    if std::env::var(ENCRYPTION_KEY_VAR).is_err() {
        eprintln!("❌ Error: {} environment variable is not set.", ENCRYPTION_KEY_VAR);
        eprintln!();
        eprintln!("Generate a key with:");
        eprintln!("  openssl rand -hex 32");
        eprintln!();
        eprintln!("Then set it:");
        eprintln!("  export {}=\"your_64_char_hex_key\"", ENCRYPTION_KEY_VAR);
        std::process::exit(1);
    }

    print!("Enter the credential to encrypt: ");
    io::stdout().flush()?;
    let mut credential = String::new();
    io::stdin().read_line(&mut credential)?;
    let credential = credential.trim();

    if credential.is_empty() {
        eprintln!("❌ Error: Credential cannot be empty");
        std::process::exit(1);
    }

    match encrypt_credential(credential) {
        Ok(encrypted) => {
            println!();
            println!("✅ Credential encrypted successfully!");
            println!();
            println!("Encrypted value:");
            println!("{}", encrypted);
            println!();
            println!("📝 Use this value for TWITTER_CONSUMER_SECRET, TWITTER_ACCESS_TOKEN_SECRET, etc.");
        }
        Err(e) => {
            eprintln!("❌ Encryption failed: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
