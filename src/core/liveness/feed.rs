// src/core/liveness/feed.rs
use tokio::sync::watch;
use tokio::time::Instant;

use super::alignment::{FaceBox, FrameDimensions};

/// One frame of the low-resolution analysis stream, reduced to what the
/// detector reported.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFrame {
    pub faces: Vec<FaceBox>,
    pub dimensions: FrameDimensions,
    pub captured_at: Instant,
}

impl AnalysisFrame {
    pub fn new(faces: Vec<FaceBox>, dimensions: FrameDimensions, captured_at: Instant) -> Self {
        Self {
            faces,
            dimensions,
            captured_at,
        }
    }

    pub fn empty(dimensions: FrameDimensions, captured_at: Instant) -> Self {
        Self::new(Vec::new(), dimensions, captured_at)
    }
}

/// Camera side of the analysis stream.
///
/// Publishing overwrites any frame the consumer has not picked up yet:
/// only the latest frame is ever analysed.
#[derive(Debug)]
pub struct FrameSender {
    tx: watch::Sender<Option<AnalysisFrame>>,
}

/// Analysis side of the stream. Single consumer.
#[derive(Debug)]
pub struct FrameReceiver {
    rx: watch::Receiver<Option<AnalysisFrame>>,
}

pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    let (tx, rx) = watch::channel(None);
    (FrameSender { tx }, FrameReceiver { rx })
}

impl FrameSender {
    /// Returns `false` once the consumer is gone.
    pub fn publish(&self, frame: AnalysisFrame) -> bool {
        self.tx.send(Some(frame)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl FrameReceiver {
    /// Waits for a frame newer than the last one returned. `None` once the
    /// camera side has been dropped.
    pub async fn next_frame(&mut self) -> Option<AnalysisFrame> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }
}
