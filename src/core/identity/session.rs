// src/core/identity/session.rs
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

use super::types::{IdMode, VerificationTarget};
use crate::core::liveness::capture::EncodedSelfie;
use crate::utils::error::{KycError, Result};

const ID_NUMBER_LEN: usize = 11;

/// Ephemeral state of one verification attempt.
///
/// Built when the ID-entry form is submitted, filled with a selfie by the
/// capture loop and consumed by the verification service. It is dropped on
/// success; on failure it comes back to the caller with its selfie marked
/// consumed, so a retry keeps the ID entry but must capture a new selfie.
pub struct KycSession {
    id: Uuid,
    target: VerificationTarget,
    first_name: String,
    last_name: String,
    selfie: Option<EncodedSelfie>,
    selfie_consumed: bool,
    account_email: Option<String>,
    created_at: DateTime<Utc>,
}

impl KycSession {
    pub fn new(
        target: VerificationTarget,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            first_name: first_name.into(),
            last_name: last_name.into(),
            selfie: None,
            selfie_consumed: false,
            account_email: None,
            created_at: Utc::now(),
        }
    }

    /// Validates the raw ID-entry form and builds a session from it.
    pub fn from_id_entry(
        mode: &str,
        id_number: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<Self> {
        let mode: IdMode = mode.parse()?;
        let id_number = id_number.trim();

        if id_number.len() != ID_NUMBER_LEN || !id_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(KycError::InvalidInput(format!(
                "Invalid {}: must be {} digits.",
                mode.label(),
                ID_NUMBER_LEN
            )));
        }

        let first_name = first_name.trim();
        let last_name = last_name.trim();
        if first_name.is_empty() || last_name.is_empty() {
            return Err(KycError::InvalidInput(
                "First name and surname are required.".into(),
            ));
        }

        Ok(Self::new(
            VerificationTarget::new(mode, id_number),
            first_name,
            last_name,
        ))
    }

    /// Pins the account email instead of resolving it from the flag store.
    pub fn with_account_email(mut self, email: impl Into<String>) -> Self {
        self.account_email = Some(email.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> IdMode {
        self.target.mode()
    }

    pub fn target(&self) -> &VerificationTarget {
        &self.target
    }

    pub fn id_number(&self) -> &str {
        self.target.id_number()
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn account_email(&self) -> Option<&str> {
        self.account_email.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The last captured selfie, consumed or not.
    pub fn selfie(&self) -> Option<&EncodedSelfie> {
        self.selfie.as_ref()
    }

    /// The selfie, unless a failed attempt already used it.
    pub fn fresh_selfie(&self) -> Option<&EncodedSelfie> {
        if self.selfie_consumed {
            None
        } else {
            self.selfie.as_ref()
        }
    }

    pub fn needs_capture(&self) -> bool {
        self.fresh_selfie().is_none()
    }

    pub fn attach_selfie(&mut self, selfie: EncodedSelfie) {
        self.selfie = Some(selfie);
        self.selfie_consumed = false;
    }

    pub(crate) fn mark_selfie_consumed(&mut self) {
        if self.selfie.is_some() {
            self.selfie_consumed = true;
        }
    }

    pub fn is_selfie_consumed(&self) -> bool {
        self.selfie_consumed
    }

    /// Wipes every user-supplied field.
    pub fn clear(&mut self) {
        self.target = VerificationTarget::new(self.target.mode(), String::new());
        self.first_name.clear();
        self.last_name.clear();
        self.selfie = None;
        self.selfie_consumed = false;
        self.account_email = None;
    }

    pub fn is_cleared(&self) -> bool {
        self.id_number().is_empty()
            && self.first_name.is_empty()
            && self.last_name.is_empty()
            && self.selfie.is_none()
    }
}

impl fmt::Debug for KycSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KycSession")
            .field("id", &self.id)
            .field("target", &self.target)
            .field("has_selfie", &self.selfie.is_some())
            .field("selfie_consumed", &self.selfie_consumed)
            .field("created_at", &self.created_at)
            .finish()
    }
}
