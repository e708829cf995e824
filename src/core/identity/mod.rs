pub mod session;
pub mod types;

pub use session::KycSession;
pub use types::{IdMode, MatchedIdentity, Step, VerificationOutcome, VerificationTarget};
