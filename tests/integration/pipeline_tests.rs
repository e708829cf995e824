// tests/integration/pipeline_tests.rs
use crate::common::*;
use escrow_kyc::{
    core::{
        identity::{session::KycSession, types::Step},
        liveness::feed::frame_channel,
        progress::{Progress, ProgressReporter},
        services::verification::VerificationRun,
    },
    network::types::{IdMatchResponse, LivenessResponse},
    storage::flags::{MemoryFlagStore, VerificationStatus},
    utils::cancel::{cancel_pair, CancelToken},
};
use std::time::Duration;

async fn capture(ctx: &TestContext, session: &mut KycSession, camera: &StaticCamera) {
    let (tx, mut rx) = frame_channel();
    let progress = ProgressReporter::silent();
    let cancel = CancelToken::never();
    tokio::select! {
        result = ctx.pipeline.capture_selfie(
            session,
            &mut rx,
            camera,
            &progress,
            &cancel,
        ) => result.expect("Failed to capture selfie"),
        _ = stream_aligned_frames(tx) => unreachable!("frames stop only when capture ends"),
    }
}

async fn verify(ctx: &TestContext, session: KycSession) -> VerificationRun {
    ctx.pipeline
        .verify(session, &ProgressReporter::silent(), &CancelToken::never())
        .await
        .expect("No other attempt in flight")
}

#[test_log::test(tokio::test)]
async fn test_capture_then_verify_end_to_end() {
    let ctx = TestContext::new();
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();

    capture(&ctx, &mut session, &camera).await;
    assert_eq!(camera.shots(), 1);
    assert!(!session.needs_capture());

    let (progress, mut updates) = ProgressReporter::channel();
    let run = ctx
        .pipeline
        .verify(session, &progress, &CancelToken::never())
        .await
        .expect("No other attempt in flight");

    let outcome = run.outcome().expect("finished run").clone();
    assert!(outcome.success);
    assert_eq!(outcome.step_reached, Step::Success);
    assert_eq!(outcome.message, "Verification successful");
    assert_eq!(outcome.confidence, Some(91.0));
    assert!(run.into_session().is_none());

    assert_eq!(ctx.api.calls(), vec!["liveness", "nin", "final"]);
    let request = ctx.api.last_final_request().expect("final request sent");
    assert_eq!(request.email, EMAIL);
    assert_eq!(request.mode, "nin");
    assert_eq!(request.first_name, "ADAEZE");
    assert_eq!(request.surname, "OBI");
    assert_eq!(request.dob, "1990-04-12");
    assert_eq!(request.nin, NIN);
    assert_eq!(request.bvn, "");
    assert_eq!(request.user_first_name, "Ada");
    assert_eq!(request.user_last_name, "Obi");

    let record = ctx.flags.snapshot();
    assert!(record.verified);
    assert_eq!(record.status, Some(VerificationStatus::Success));

    drop(progress);
    let mut seen = Vec::new();
    while let Some(update) = updates.recv().await {
        seen.push(update.to_string());
    }
    assert_eq!(
        seen,
        vec!["Checking liveness...", "Verifying NIN...", "Saving verification..."]
    );
}

#[tokio::test]
async fn test_bvn_uses_bvn_endpoint() {
    let ctx = TestContext::new();
    let camera = StaticCamera::new();
    let mut session =
        KycSession::from_id_entry("BVN", BVN, "Ada", "Obi").expect("valid id entry");
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;

    assert!(run.is_success());
    assert_eq!(ctx.api.calls(), vec!["liveness", "bvn", "final"]);
    let request = ctx.api.last_final_request().unwrap();
    assert_eq!(request.mode, "bvn");
    assert_eq!(request.bvn, BVN);
    assert_eq!(request.nin, "");
}

#[tokio::test]
async fn test_missing_email_makes_no_calls() {
    let ctx = TestContext::with_flags(MemoryFlagStore::new());
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;

    let outcome = run.outcome().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "missing user email");
    assert!(ctx.api.calls().is_empty());
    assert!(!ctx.flags.snapshot().verified);
}

#[tokio::test]
async fn test_session_email_overrides_store() {
    let ctx = TestContext::with_flags(MemoryFlagStore::new());
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session().with_account_email("other@example.com");
    capture(&ctx, &mut session, &camera).await;

    assert!(verify(&ctx, session).await.is_success());
    assert_eq!(ctx.api.last_final_request().unwrap().email, "other@example.com");
}

#[tokio::test]
async fn test_liveness_rejection_stops_before_id_match() {
    let ctx = TestContext::new();
    ctx.api.set_liveness(Ok(Some(liveness_reply("pending", false))));
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;

    let outcome = run.outcome().unwrap();
    assert_eq!(outcome.step_reached, Step::Liveness);
    assert_eq!(outcome.message, "Liveness pending");
    assert_eq!(ctx.api.calls(), vec!["liveness"]);
    let record = ctx.flags.snapshot();
    assert!(!record.verified);
    assert_eq!(record.status, Some(VerificationStatus::Failed));
}

#[tokio::test]
async fn test_null_liveness_body() {
    let ctx = TestContext::new();
    ctx.api.set_liveness(Ok(None::<LivenessResponse>));
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;
    assert_eq!(run.outcome().unwrap().message, "Liveness failed");
}

#[tokio::test]
async fn test_id_match_without_record_is_invalid_nin() {
    let ctx = TestContext::new();
    ctx.api.set_nin(Ok(Some(IdMatchResponse {
        message: Some("not found".into()),
        matched: Some(false),
        ..Default::default()
    })));
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;

    let outcome = run.outcome().unwrap();
    assert_eq!(outcome.step_reached, Step::IdMatch);
    assert_eq!(outcome.message, "Invalid NIN");
    assert_eq!(ctx.api.calls(), vec!["liveness", "nin"]);
}

#[tokio::test]
async fn test_http_status_maps_to_user_message() {
    let ctx = TestContext::new();
    ctx.api.set_nin(Err(404));
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;
    assert_eq!(run.outcome().unwrap().message, "Resource not found");
    assert_eq!(ctx.pipeline.metrics().snapshot().id_match_failures, 1);
}

#[tokio::test]
async fn test_final_rejection_then_retry_with_new_selfie() {
    let ctx = TestContext::new();
    ctx.api.set_final(Ok(Some(final_reply("error", Some("Name mismatch")))));
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;
    let outcome = run.outcome().unwrap().clone();
    assert_eq!(outcome.step_reached, Step::FinalCommit);
    assert_eq!(outcome.message, "Name mismatch");
    assert!(!ctx.flags.snapshot().verified);

    let mut retained = run.into_session().expect("session kept for retry");
    assert_eq!(retained.id_number(), NIN);
    assert!(retained.needs_capture());

    ctx.api.set_final(Ok(Some(final_reply("success", None))));
    capture(&ctx, &mut retained, &camera).await;
    assert_eq!(camera.shots(), 2);

    let retry = verify(&ctx, retained).await;
    assert!(retry.is_success());
    assert!(ctx.flags.snapshot().verified);
    assert_eq!(
        ctx.api.calls(),
        vec!["liveness", "nin", "final", "liveness", "nin", "final"]
    );
}

#[tokio::test]
async fn test_final_status_must_be_lowercase_success() {
    let ctx = TestContext::new();
    ctx.api.set_final(Ok(Some(final_reply("Success", None))));
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let run = verify(&ctx, session).await;
    let outcome = run.outcome().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Final verification failed");
    assert!(!ctx.flags.snapshot().verified);
}

#[tokio::test]
async fn test_dropping_scope_cancels_in_flight_attempt() {
    let ctx = TestContext::new();
    ctx.api.delay_liveness(Duration::from_millis(500));
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    capture(&ctx, &mut session, &camera).await;

    let (handle, token) = cancel_pair();
    let progress = ProgressReporter::silent();
    let attempt = ctx.pipeline.verify(session, &progress, &token);
    let teardown = async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(handle);
    };
    let (run, _) = tokio::join!(attempt, teardown);

    match run.expect("No other attempt in flight") {
        VerificationRun::Cancelled { step, session } => {
            assert_eq!(step, Step::Liveness);
            assert!(!session.needs_capture());
        }
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert_eq!(ctx.api.calls(), vec!["liveness"]);
    let record = ctx.flags.snapshot();
    assert!(!record.verified);
    assert_ne!(record.status, Some(VerificationStatus::Failed));
    assert_eq!(ctx.pipeline.metrics().snapshot().attempts_cancelled, 1);
}

#[tokio::test]
async fn test_capture_progress_counts_down() {
    let ctx = TestContext::new();
    let camera = StaticCamera::new();
    let mut session = ctx.nin_session();
    let (tx, mut rx) = frame_channel();
    let (progress, mut updates) = ProgressReporter::channel();
    let cancel = CancelToken::never();

    tokio::select! {
        result = ctx.pipeline.capture_selfie(
            &mut session,
            &mut rx,
            &camera,
            &progress,
            &cancel,
        ) => result.unwrap(),
        _ = stream_aligned_frames(tx) => unreachable!(),
    }
    drop(progress);

    let mut seen = Vec::new();
    while let Some(update) = updates.recv().await {
        seen.push(update);
    }
    assert!(seen.contains(&Progress::HoldSteady { seconds_left: 3 }));
    assert!(seen.contains(&Progress::Capturing));
    assert_eq!(seen.last(), Some(&Progress::AnalyzingLiveness));
}
