//! Media upload sequencing.
//!
//! Photos are attached to tweets and direct messages through the chunked
//! `media/upload` protocol: INIT declares the size and type and returns a
//! media id, APPEND sends the bytes, FINALIZE closes the session. Each step
//! depends on the media id from INIT, so the three calls run strictly in order.
//!
//! The whole file is sent as a single segment (index 0). Large files are not
//! split into multiple chunks.

use log::{debug, error, info};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::transport::{Options, Transport, TransportError};

/// Endpoint shared by all three upload phases.
pub const UPLOAD_PATH: &str = "media/upload";

/// A local image to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Path to the file on disk
    pub path: PathBuf,
    /// Declared MIME type, e.g. `image/jpeg`. Not checked against the content.
    pub media_type: String,
}

impl UploadRequest {
    pub fn new(path: impl Into<PathBuf>, media_type: impl Into<String>) -> Self {
        UploadRequest {
            path: path.into(),
            media_type: media_type.into(),
        }
    }
}

/// The three phases of the upload protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Init,
    Append,
    Finalize,
}

impl UploadPhase {
    /// The `command` discriminator sent for this phase.
    pub fn command(self) -> &'static str {
        match self {
            UploadPhase::Init => "INIT",
            UploadPhase::Append => "APPEND",
            UploadPhase::Finalize => "FINALIZE",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

/// Why an upload did not complete.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The local file could not be read; no request was sent.
    #[error("failed to read media file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// One of the three requests was rejected.
    #[error("media upload {phase} failed: {source}")]
    Phase {
        phase: UploadPhase,
        #[source]
        source: TransportError,
    },
    /// INIT succeeded but its response carried no media id.
    #[error("media upload INIT response did not contain a media id")]
    MissingMediaId { response: Value },
}

impl UploadError {
    /// The phase that failed, or `None` when the failure happened before INIT.
    pub fn phase(&self) -> Option<UploadPhase> {
        match self {
            UploadError::Read { .. } => None,
            UploadError::Phase { phase, .. } => Some(*phase),
            UploadError::MissingMediaId { .. } => Some(UploadPhase::Init),
        }
    }
}

/// Extracts the session identifier from an INIT response.
///
/// `media_id_string` is preferred; the numeric `media_id` is accepted as a
/// fallback since 64-bit ids lose precision in some JSON consumers.
pub fn extract_media_id(response: &Value) -> Option<String> {
    if let Some(id) = response.get("media_id_string").and_then(|v| v.as_str()) {
        if !id.is_empty() {
            return Some(id.to_string());
        }
    }
    response
        .get("media_id")
        .and_then(|v| v.as_u64())
        .map(|id| id.to_string())
}

/// Uploads one photo through INIT, APPEND and FINALIZE.
///
/// The file is read fully into memory and its size taken from file metadata
/// before any request is made. The first failing step ends the sequence and
/// is returned with its phase; nothing is retried.
///
/// # Returns
///
/// - `Ok(Value)`: The FINALIZE response, which carries the `media_id_string`
///   to attach in a later status update or message
/// - `Err(UploadError)`: The read failure, or the failing phase and its cause
pub async fn upload_media(
    transport: &dyn Transport,
    request: &UploadRequest,
) -> Result<Value, UploadError> {
    info!(
        "Starting media upload for {} ({})",
        request.path.display(),
        request.media_type
    );

    let result = run_sequence(transport, request).await;
    if let Err(e) = &result {
        error!("Media upload for {} failed: {}", request.path.display(), e);
    }
    result
}

async fn run_sequence(
    transport: &dyn Transport,
    request: &UploadRequest,
) -> Result<Value, UploadError> {
    let read_error = |source: std::io::Error| UploadError::Read {
        path: request.path.clone(),
        source,
    };
    let media = tokio::fs::read(&request.path).await.map_err(read_error)?;
    let total_bytes = tokio::fs::metadata(&request.path)
        .await
        .map_err(read_error)?
        .len();
    debug!(
        "Loaded {} bytes from {} (declared size {})",
        media.len(),
        request.path.display(),
        total_bytes
    );

    let init = Options::new()
        .with("command", UploadPhase::Init.command())
        .with("total_bytes", total_bytes)
        .with("media_type", request.media_type.as_str());
    let init_response = send_phase(transport, UploadPhase::Init, &init).await?;

    let media_id = match extract_media_id(&init_response) {
        Some(id) => id,
        None => {
            return Err(UploadError::MissingMediaId {
                response: init_response,
            })
        }
    };
    info!("Media upload session {} initialized", media_id);

    let append = Options::new()
        .with("command", UploadPhase::Append.command())
        .with("media_id", media_id.as_str())
        .with("media", media)
        .with("segment_index", "0");
    send_phase(transport, UploadPhase::Append, &append).await?;

    let finalize = Options::new()
        .with("command", UploadPhase::Finalize.command())
        .with("media_id", media_id.as_str());
    let finalized = send_phase(transport, UploadPhase::Finalize, &finalize).await?;

    info!("Media upload session {} finalized", media_id);
    Ok(finalized)
}

async fn send_phase(
    transport: &dyn Transport,
    phase: UploadPhase,
    options: &Options,
) -> Result<Value, UploadError> {
    debug!("Sending media upload {}", phase);
    transport
        .post(UPLOAD_PATH, options)
        .await
        .map_err(|source| UploadError::Phase { phase, source })
}
