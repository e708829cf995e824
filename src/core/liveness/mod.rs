// src/core/liveness/mod.rs
pub mod alignment;
pub mod capture;
pub mod feed;
pub mod stability;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use alignment::{AlignmentTarget, FaceBox, FaceGeometry, FrameDimensions};
pub use capture::{
    capture_and_encode, CaptureDevice, CaptureError, EncodedSelfie, FileCaptureDevice,
};
pub use feed::{frame_channel, AnalysisFrame, FrameReceiver, FrameSender};
pub use stability::{GateEvent, GateState, StabilityGate};

use crate::{
    core::progress::{Progress, ProgressReporter},
    utils::{
        cancel::CancelToken,
        config::LivenessConfig,
        error::{KycError, Result},
        metrics::Metrics,
    },
};

/// Consumes the analysis stream until a face has held still in the target
/// zone long enough, then takes one full-resolution still.
pub struct LivenessCapture {
    target: AlignmentTarget,
    hold: Duration,
    metrics: Arc<Metrics>,
}

impl LivenessCapture {
    pub fn new(config: &LivenessConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            target: AlignmentTarget::from(config),
            hold: Duration::from_millis(config.hold_ms),
            metrics,
        }
    }

    pub fn target(&self) -> &AlignmentTarget {
        &self.target
    }

    /// Runs capture cycles until one produces a selfie.
    ///
    /// A failed still resets the gate; the next attempt needs a full new
    /// hold. Cancellation is checked before each frame and while the still
    /// is being taken.
    pub async fn run(
        &self,
        frames: &mut FrameReceiver,
        device: &dyn CaptureDevice,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<EncodedSelfie> {
        let mut gate = StabilityGate::new(self.hold);
        let mut last_reported: Option<Progress> = None;
        let mut report = |update: Progress| {
            if last_reported.as_ref() != Some(&update) {
                progress.report(update.clone());
                last_reported = Some(update);
            }
        };

        loop {
            if cancel.is_cancelled() {
                return Err(KycError::Cancelled);
            }

            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(KycError::Cancelled),
                frame = frames.next_frame() => frame,
            };
            let frame = frame.ok_or(KycError::Capture(CaptureError::StreamClosed))?;

            let aligned = self.target.evaluate(&frame.faces, frame.dimensions);
            match gate.observe(aligned, frame.captured_at) {
                GateEvent::Searching => report(Progress::MoveIntoFrame),
                GateEvent::Holding { seconds_left } => {
                    report(Progress::HoldSteady { seconds_left })
                }
                GateEvent::Triggered => {}
                GateEvent::Trigger => {
                    info!("Face held steady, capturing");
                    report(Progress::Capturing);

                    let captured = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(KycError::Cancelled),
                        captured = capture_and_encode(device) => captured,
                    };

                    match captured {
                        Ok(selfie) => {
                            self.metrics.record_capture(true);
                            report(Progress::AnalyzingLiveness);
                            return Ok(selfie);
                        }
                        Err(e) => {
                            self.metrics.record_capture(false);
                            warn!("Capture failed, waiting for a new hold: {}", e);
                            report(Progress::CaptureFailed);
                            gate.reset();
                        }
                    }
                }
            }
            debug!(aligned, state = ?gate.state(), "Frame analysed");
        }
    }
}
