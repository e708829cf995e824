// src/utils/error.rs
use thiserror::Error;

use crate::{
    core::{identity::types::Step, liveness::capture::CaptureError},
    network::error::NetworkError,
    storage::errors::StorageError,
};

/// Every way a verification attempt can stop short of success.
///
/// `Transport`, `Protocol`, `Business` and `Prerequisite` are the four
/// failure kinds a terminal outcome can carry. The remaining variants come
/// from local collaborators (camera, store, config) or from cancellation.
#[derive(Debug, Error)]
pub enum KycError {
    #[error("Transport error during {step}: {source}")]
    Transport {
        step: Step,
        #[source]
        source: NetworkError,
    },

    #[error("Protocol error during {step}: {message}")]
    Protocol { step: Step, message: String },

    #[error("Rejected during {step}: {message}")]
    Business { step: Step, message: String },

    #[error("Prerequisite error: {0}")]
    Prerequisite(String),

    #[error("Verification cancelled")]
    Cancelled,

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl KycError {
    /// Plain text shown to the user as the terminal failure reason.
    pub fn user_message(&self) -> String {
        match self {
            KycError::Transport { source, .. } => source.user_message(),
            KycError::Protocol { message, .. }
            | KycError::Business { message, .. }
            | KycError::Prerequisite(message)
            | KycError::InvalidInput(message) => message.clone(),
            KycError::Cancelled => "Verification cancelled".to_string(),
            KycError::Capture(_) => "Capture failed.".to_string(),
            KycError::Storage(e) => format!("Could not access local storage: {}", e),
            KycError::Config(e) => format!("Configuration error: {}", e),
        }
    }

    /// The remote step the error was raised in, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            KycError::Transport { step, .. }
            | KycError::Protocol { step, .. }
            | KycError::Business { step, .. } => Some(*step),
            KycError::Prerequisite(_) => Some(Step::Prerequisites),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, KycError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, KycError>;
