// src/core/services/verification.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::{
    core::{
        identity::{
            session::KycSession,
            types::{IdMode, MatchedIdentity, Step, VerificationOutcome, VerificationTarget},
        },
        progress::{Progress, ProgressReporter},
    },
    network::{
        client::VerificationApi,
        error::NetworkError,
        types::{
            BvnMatchRequest, FinalCommitRequest, IdMatchResponse, LivenessRequest,
            NinMatchRequest,
        },
    },
    storage::flags::{FlagStore, VerificationStatus},
    utils::{
        cancel::CancelToken,
        error::{KycError, Result},
        metrics::Metrics,
    },
};

const MISSING_DATA: &str = "missing verification data";
const MISSING_EMAIL: &str = "missing user email";
const LIVENESS_FAILED: &str = "Liveness failed";
const FINAL_FAILED: &str = "Final verification failed";

/// How a call to [`VerificationService::verify`] ended.
#[derive(Debug)]
pub enum VerificationRun {
    /// Terminal outcome. The session comes back only on failure, with its
    /// selfie marked consumed.
    Finished {
        outcome: VerificationOutcome,
        session: Option<KycSession>,
    },
    /// The scope was torn down mid-run. Nothing was persisted after the
    /// cancellation was seen.
    Cancelled { step: Step, session: KycSession },
}

impl VerificationRun {
    pub fn outcome(&self) -> Option<&VerificationOutcome> {
        match self {
            VerificationRun::Finished { outcome, .. } => Some(outcome),
            VerificationRun::Cancelled { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome().map(|o| o.success).unwrap_or(false)
    }

    pub fn into_session(self) -> Option<KycSession> {
        match self {
            VerificationRun::Finished { session, .. } => session,
            VerificationRun::Cancelled { session, .. } => Some(session),
        }
    }
}

/// Inputs that passed the prerequisite check.
struct Prepared {
    email: String,
    selfie: String,
}

struct Verified {
    liveness_confidence: Option<f64>,
    matched: MatchedIdentity,
}

/// Drives liveness, identity match and final commit strictly in sequence.
/// The first failing step ends the run; nothing is retried.
pub struct VerificationService {
    api: Arc<dyn VerificationApi>,
    flags: Arc<dyn FlagStore>,
    metrics: Arc<Metrics>,
}

impl VerificationService {
    pub fn new(
        api: Arc<dyn VerificationApi>,
        flags: Arc<dyn FlagStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { api, flags, metrics }
    }

    pub async fn verify(
        &self,
        session: KycSession,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> VerificationRun {
        let attempt = Uuid::new_v4();
        let span = info_span!(
            "kyc_attempt",
            attempt = %attempt,
            session = %session.id(),
            subject = ?session.target(),
        );

        self.run_attempt(attempt, session, progress, cancel)
            .instrument(span)
            .await
    }

    async fn run_attempt(
        &self,
        attempt: Uuid,
        mut session: KycSession,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> VerificationRun {
        let started = Instant::now();
        self.metrics.record_attempt_started();
        info!("Starting verification attempt");

        let prepared = match self.check_prerequisites(&session).await {
            Ok(prepared) => prepared,
            Err(e) => {
                return self
                    .fail(attempt, Step::Prerequisites, e, session, started, cancel)
                    .await;
            }
        };

        if cancel.is_cancelled() {
            return self.cancelled(Step::Prerequisites, session);
        }
        self.bookkeep_status(VerificationStatus::Pending).await;

        let mut reached = Step::Liveness;
        let result = self
            .drive(&session, &prepared, &mut reached, progress, cancel)
            .await;

        let verified = match result {
            Ok(verified) => verified,
            Err(KycError::Cancelled) => return self.cancelled(reached, session),
            Err(e) => return self.fail(attempt, reached, e, session, started, cancel).await,
        };

        // The commit went through; apply it locally unless the scope is gone.
        if cancel.is_cancelled() {
            return self.cancelled(Step::Success, session);
        }
        if let Err(e) = self.flags.set_verified(true).await {
            error!("Failed to persist verified flag: {}", e);
            return self
                .fail(attempt, Step::Success, KycError::Storage(e), session, started, cancel)
                .await;
        }
        self.bookkeep_status(VerificationStatus::Success).await;
        self.bookkeep_progress(Step::Success).await;
        session.clear();

        let confidence = verified.matched.confidence.or(verified.liveness_confidence);
        self.metrics.record_success(started.elapsed());
        info!("Verification attempt succeeded");

        VerificationRun::Finished {
            outcome: VerificationOutcome::succeeded(attempt, confidence),
            session: None,
        }
    }

    async fn check_prerequisites(&self, session: &KycSession) -> Result<Prepared> {
        let selfie = match session.fresh_selfie() {
            Some(selfie) if !selfie.is_empty() => selfie.as_str().to_string(),
            _ => return Err(KycError::Prerequisite(MISSING_DATA.into())),
        };
        if session.id_number().trim().is_empty() {
            return Err(KycError::Prerequisite(MISSING_DATA.into()));
        }

        let email = match session.account_email() {
            Some(email) => Some(email.to_string()),
            None => self.flags.get_account_email().await?,
        };
        let email = match email {
            Some(email) if !email.trim().is_empty() => email,
            _ => return Err(KycError::Prerequisite(MISSING_EMAIL.into())),
        };

        Ok(Prepared { email, selfie })
    }

    async fn drive(
        &self,
        session: &KycSession,
        prepared: &Prepared,
        reached: &mut Step,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<Verified> {
        *reached = Step::Liveness;
        self.bookkeep_progress(Step::Liveness).await;
        progress.report(Progress::CheckingLiveness);
        let liveness_confidence = self.check_liveness(&prepared.selfie, cancel).await?;

        *reached = Step::IdMatch;
        self.bookkeep_progress(Step::IdMatch).await;
        progress.report(Progress::VerifyingId { mode: session.mode() });
        let matched = self
            .match_identity(session.target(), &prepared.selfie, cancel)
            .await?;

        *reached = Step::FinalCommit;
        self.bookkeep_progress(Step::FinalCommit).await;
        progress.report(Progress::SavingVerification);
        self.commit(session, &prepared.email, &matched, cancel).await?;

        Ok(Verified {
            liveness_confidence,
            matched,
        })
    }

    async fn check_liveness(&self, selfie: &str, cancel: &CancelToken) -> Result<Option<f64>> {
        let request = LivenessRequest {
            image: selfie.to_string(),
        };
        let response = self
            .call(Step::Liveness, LIVENESS_FAILED, cancel, self.api.verify_liveness(request))
            .await?;

        match response {
            Some(body) if body.passed() => {
                info!(confidence = ?body.confidence(), "Liveness passed");
                Ok(body.confidence())
            }
            Some(body) => Err(KycError::Business {
                step: Step::Liveness,
                message: server_message(body.message, LIVENESS_FAILED),
            }),
            None => Err(KycError::Protocol {
                step: Step::Liveness,
                message: LIVENESS_FAILED.into(),
            }),
        }
    }

    async fn match_identity(
        &self,
        target: &VerificationTarget,
        selfie: &str,
        cancel: &CancelToken,
    ) -> Result<MatchedIdentity> {
        let mode = target.mode();
        let invalid = format!("Invalid {}", mode.label());

        let response = match target {
            VerificationTarget::Nin { id_number } => {
                let request = NinMatchRequest {
                    nin: id_number.clone(),
                    selfie_image: selfie.to_string(),
                };
                self.call(Step::IdMatch, &invalid, cancel, self.api.verify_nin(request))
                    .await?
            }
            VerificationTarget::Bvn { id_number } => {
                let request = BvnMatchRequest {
                    bvn: id_number.clone(),
                    selfie_image: selfie.to_string(),
                };
                self.call(Step::IdMatch, &invalid, cancel, self.api.verify_bvn(request))
                    .await?
            }
        };

        let matched = extract_match(mode, response).ok_or_else(|| KycError::Protocol {
            step: Step::IdMatch,
            message: invalid,
        })?;
        info!(confidence = ?matched.confidence, "Identity record matched");
        Ok(matched)
    }

    async fn commit(
        &self,
        session: &KycSession,
        email: &str,
        matched: &MatchedIdentity,
        cancel: &CancelToken,
    ) -> Result<()> {
        let mode = session.mode();
        let (nin, bvn) = match mode {
            IdMode::Nin => (matched.id_value.clone(), String::new()),
            IdMode::Bvn => (String::new(), matched.id_value.clone()),
        };
        let request = FinalCommitRequest {
            email: email.to_string(),
            mode: mode.as_str().to_string(),
            first_name: matched.first_name.clone(),
            surname: matched.last_name.clone(),
            dob: matched.date_of_birth.clone(),
            nin,
            bvn,
            user_first_name: session.first_name().to_string(),
            user_last_name: session.last_name().to_string(),
        };

        let response = self
            .call(Step::FinalCommit, FINAL_FAILED, cancel, self.api.final_commit(request))
            .await?;

        match response {
            Some(body) if body.committed() => Ok(()),
            Some(body) => Err(KycError::Business {
                step: Step::FinalCommit,
                message: server_message(body.message, FINAL_FAILED),
            }),
            None => Err(KycError::Protocol {
                step: Step::FinalCommit,
                message: FINAL_FAILED.into(),
            }),
        }
    }

    /// One remote call, abandoned as soon as cancellation is requested.
    async fn call<T, F>(
        &self,
        step: Step,
        fallback: &str,
        cancel: &CancelToken,
        request: F,
    ) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, NetworkError>>,
    {
        if cancel.is_cancelled() {
            return Err(KycError::Cancelled);
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(KycError::Cancelled),
            result = request => result,
        };

        match result {
            Ok(value) => Ok(value),
            Err(NetworkError::Decode(e)) => {
                warn!(%step, "Undecodable response: {}", e);
                Err(KycError::Protocol {
                    step,
                    message: fallback.to_string(),
                })
            }
            Err(source) => {
                warn!(%step, "Transport failure: {}", source);
                Err(KycError::Transport { step, source })
            }
        }
    }

    async fn fail(
        &self,
        attempt: Uuid,
        step: Step,
        error: KycError,
        mut session: KycSession,
        started: Instant,
        cancel: &CancelToken,
    ) -> VerificationRun {
        if cancel.is_cancelled() {
            return self.cancelled(step, session);
        }

        warn!(%step, "Verification attempt failed: {}", error);
        session.mark_selfie_consumed();
        self.bookkeep_status(VerificationStatus::Failed).await;
        self.metrics.record_failure(step, started.elapsed());

        VerificationRun::Finished {
            outcome: VerificationOutcome::failed(attempt, step, error.user_message()),
            session: Some(session),
        }
    }

    fn cancelled(&self, step: Step, session: KycSession) -> VerificationRun {
        info!(%step, "Verification attempt cancelled");
        self.metrics.record_cancelled();
        VerificationRun::Cancelled { step, session }
    }

    async fn bookkeep_status(&self, status: VerificationStatus) {
        if let Err(e) = self.flags.set_verification_status(status).await {
            warn!(%status, "Failed to record verification status: {}", e);
        }
    }

    async fn bookkeep_progress(&self, step: Step) {
        if let Err(e) = self.flags.set_kyc_progress(step).await {
            warn!(%step, "Failed to record KYC progress: {}", e);
        }
    }
}

/// Backend text when present and non-blank, the step default otherwise.
fn server_message(message: Option<String>, fallback: &str) -> String {
    message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn extract_match(mode: IdMode, response: Option<IdMatchResponse>) -> Option<MatchedIdentity> {
    let response = response?;
    let record = response.data?;
    let id_value = match mode {
        IdMode::Nin => record.nin,
        IdMode::Bvn => record.bvn,
    };

    Some(MatchedIdentity {
        first_name: record.first_name.unwrap_or_default(),
        last_name: record.last_name.unwrap_or_default(),
        date_of_birth: record.date_of_birth.unwrap_or_default(),
        id_value: id_value.unwrap_or_default(),
        confidence: response.confidence,
    })
}
