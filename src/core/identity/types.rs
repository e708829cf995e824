// src/core/identity/types.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::KycError;

/// National identity scheme anchoring one verification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdMode {
    Nin,
    Bvn,
}

impl IdMode {
    /// Wire value used by the commit endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdMode::Nin => "nin",
            IdMode::Bvn => "bvn",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IdMode::Nin => "NIN",
            IdMode::Bvn => "BVN",
        }
    }
}

impl fmt::Display for IdMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IdMode {
    type Err = KycError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nin" => Ok(IdMode::Nin),
            "bvn" => Ok(IdMode::Bvn),
            other => Err(KycError::InvalidInput(format!(
                "Unknown verification mode '{}'",
                other
            ))),
        }
    }
}

/// Which scheme to verify against, together with the number entered.
#[derive(Clone, PartialEq, Eq)]
pub enum VerificationTarget {
    Nin { id_number: String },
    Bvn { id_number: String },
}

impl VerificationTarget {
    pub fn new(mode: IdMode, id_number: impl Into<String>) -> Self {
        let id_number = id_number.into();
        match mode {
            IdMode::Nin => VerificationTarget::Nin { id_number },
            IdMode::Bvn => VerificationTarget::Bvn { id_number },
        }
    }

    pub fn mode(&self) -> IdMode {
        match self {
            VerificationTarget::Nin { .. } => IdMode::Nin,
            VerificationTarget::Bvn { .. } => IdMode::Bvn,
        }
    }

    pub fn id_number(&self) -> &str {
        match self {
            VerificationTarget::Nin { id_number } | VerificationTarget::Bvn { id_number } => {
                id_number
            }
        }
    }

    /// Id number with all but the last four digits hidden, for logs.
    pub fn masked(&self) -> String {
        mask_id(self.id_number())
    }
}

impl fmt::Debug for VerificationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.mode().label(), self.masked())
    }
}

pub(crate) fn mask_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    let mut masked = "*".repeat(hidden);
    masked.extend(&chars[hidden..]);
    masked
}

/// Stages of one verification attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Prerequisites,
    Liveness,
    IdMatch,
    FinalCommit,
    Success,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Prerequisites => "prerequisites",
            Step::Liveness => "liveness",
            Step::IdMatch => "id_match",
            Step::FinalCommit => "final_commit",
            Step::Success => "success",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity record the lookup backend matched the selfie against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedIdentity {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub id_value: String,
    pub confidence: Option<f64>,
}

/// Terminal result of one pipeline run, handed to the UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub attempt_id: Uuid,
    pub step_reached: Step,
    pub success: bool,
    pub message: String,
    pub confidence: Option<f64>,
    pub completed_at: DateTime<Utc>,
}

impl VerificationOutcome {
    pub fn succeeded(attempt_id: Uuid, confidence: Option<f64>) -> Self {
        Self {
            attempt_id,
            step_reached: Step::Success,
            success: true,
            message: "Verification successful".to_string(),
            confidence,
            completed_at: Utc::now(),
        }
    }

    pub fn failed(attempt_id: Uuid, step: Step, message: impl Into<String>) -> Self {
        Self {
            attempt_id,
            step_reached: step,
            success: false,
            message: message.into(),
            confidence: None,
            completed_at: Utc::now(),
        }
    }
}
