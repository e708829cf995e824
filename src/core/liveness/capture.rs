// src/core/liveness/capture.rs
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

#[cfg(test)]
use mockall::automock;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture device error: {0}")]
    Device(String),

    #[error("Frame stream closed")]
    StreamClosed,

    #[error("Captured image was empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The full-resolution still path of the camera, separate from the
/// low-resolution analysis stream.
///
/// Implementations return the compressed image bytes exactly as the
/// device produced them.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn capture_still(&self) -> Result<Vec<u8>, CaptureError>;
}

/// Selfie as sent over JSON: standard base64, no line wrapping.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedSelfie {
    encoded: String,
    byte_len: usize,
    captured_at: DateTime<Utc>,
}

impl EncodedSelfie {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            encoded: STANDARD.encode(bytes),
            byte_len: bytes.len(),
            captured_at: Utc::now(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Size of the raw image before encoding.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }
}

impl fmt::Debug for EncodedSelfie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedSelfie")
            .field("byte_len", &self.byte_len)
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

/// Takes exactly one still and encodes it. No retries: on error the caller
/// starts a fresh hold cycle.
pub async fn capture_and_encode(device: &dyn CaptureDevice) -> Result<EncodedSelfie, CaptureError> {
    let bytes = device.capture_still().await.map_err(|e| {
        error!("Capture failed: {}", e);
        e
    })?;

    if bytes.is_empty() {
        error!("Capture returned no data");
        return Err(CaptureError::Empty);
    }

    let selfie = EncodedSelfie::from_bytes(&bytes);
    info!(size_kb = bytes.len() / 1024, "Capture success");
    Ok(selfie)
}

/// Reads a still image from disk. Used where no camera is attached.
#[derive(Debug, Clone)]
pub struct FileCaptureDevice {
    path: PathBuf,
}

impl FileCaptureDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureDevice for FileCaptureDevice {
    async fn capture_still(&self) -> Result<Vec<u8>, CaptureError> {
        Ok(tokio::fs::read(&self.path).await?)
    }
}
