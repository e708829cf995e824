// src/core/progress.rs
use std::fmt;
use tokio::sync::mpsc;

use crate::core::identity::types::IdMode;

/// Informational updates for the UI while capture and verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    MoveIntoFrame,
    HoldSteady { seconds_left: u64 },
    Capturing,
    CaptureFailed,
    AnalyzingLiveness,
    CheckingLiveness,
    VerifyingId { mode: IdMode },
    SavingVerification,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::MoveIntoFrame => f.write_str("Kindly move your face into the frame"),
            Progress::HoldSteady { seconds_left } => write!(f, "Hold steady... {}s", seconds_left),
            Progress::Capturing => f.write_str("Capturing..."),
            Progress::CaptureFailed => f.write_str("Capture failed."),
            Progress::AnalyzingLiveness => f.write_str("Analyzing liveness..."),
            Progress::CheckingLiveness => f.write_str("Checking liveness..."),
            Progress::VerifyingId { mode } => write!(f, "Verifying {}...", mode.label()),
            Progress::SavingVerification => f.write_str("Saving verification..."),
        }
    }
}

/// Sending half of the progress stream. Delivery is best effort: a closed
/// or missing receiver never affects the pipeline.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<Progress>>,
}

impl ProgressReporter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A reporter that drops every update.
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, progress: Progress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(progress);
        }
    }
}
