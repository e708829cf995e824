// src/utils/metrics.rs
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::identity::types::Step;

/// Process-wide counters for capture cycles and verification attempts.
#[derive(Debug, Default)]
pub struct Metrics {
    attempts_started: AtomicU64,
    attempts_succeeded: AtomicU64,
    attempts_cancelled: AtomicU64,
    prerequisite_failures: AtomicU64,
    liveness_failures: AtomicU64,
    id_match_failures: AtomicU64,
    final_commit_failures: AtomicU64,
    captures_triggered: AtomicU64,
    captures_failed: AtomicU64,
    orchestration_micros: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub attempts_started: u64,
    pub attempts_succeeded: u64,
    pub attempts_failed: u64,
    pub attempts_cancelled: u64,
    pub prerequisite_failures: u64,
    pub liveness_failures: u64,
    pub id_match_failures: u64,
    pub final_commit_failures: u64,
    pub captures_triggered: u64,
    pub captures_failed: u64,
    pub orchestration_micros: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt_started(&self) {
        self.attempts_started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_success(&self, duration: Duration) {
        self.attempts_succeeded.fetch_add(1, Ordering::SeqCst);
        self.add_time(duration);
    }

    pub fn record_failure(&self, step: Step, duration: Duration) {
        let counter = match step {
            Step::Prerequisites => &self.prerequisite_failures,
            Step::Liveness => &self.liveness_failures,
            Step::IdMatch => &self.id_match_failures,
            // Persisting the verified flag failed after the commit.
            Step::FinalCommit | Step::Success => &self.final_commit_failures,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.add_time(duration);
    }

    pub fn record_cancelled(&self) {
        self.attempts_cancelled.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_capture(&self, success: bool) {
        self.captures_triggered.fetch_add(1, Ordering::SeqCst);
        if !success {
            self.captures_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn add_time(&self, duration: Duration) {
        self.orchestration_micros
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let prerequisite_failures = self.prerequisite_failures.load(Ordering::SeqCst);
        let liveness_failures = self.liveness_failures.load(Ordering::SeqCst);
        let id_match_failures = self.id_match_failures.load(Ordering::SeqCst);
        let final_commit_failures = self.final_commit_failures.load(Ordering::SeqCst);

        MetricsSnapshot {
            attempts_started: self.attempts_started.load(Ordering::SeqCst),
            attempts_succeeded: self.attempts_succeeded.load(Ordering::SeqCst),
            attempts_failed: prerequisite_failures
                + liveness_failures
                + id_match_failures
                + final_commit_failures,
            attempts_cancelled: self.attempts_cancelled.load(Ordering::SeqCst),
            prerequisite_failures,
            liveness_failures,
            id_match_failures,
            final_commit_failures,
            captures_triggered: self.captures_triggered.load(Ordering::SeqCst),
            captures_failed: self.captures_failed.load(Ordering::SeqCst),
            orchestration_micros: self.orchestration_micros.load(Ordering::SeqCst),
        }
    }

    pub fn log(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            attempts_started = snapshot.attempts_started,
            attempts_succeeded = snapshot.attempts_succeeded,
            attempts_failed = snapshot.attempts_failed,
            attempts_cancelled = snapshot.attempts_cancelled,
            captures_triggered = snapshot.captures_triggered,
            captures_failed = snapshot.captures_failed,
            orchestration_micros = snapshot.orchestration_micros,
            "KYC metrics"
        );
    }
}
