// src/core/services/mod.rs
pub mod verification;

pub use verification::{VerificationRun, VerificationService};
