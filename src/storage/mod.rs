// src/storage/mod.rs
pub mod errors;
pub mod flags;

pub use errors::StorageError;
pub use flags::{FlagRecord, FlagStore, MemoryFlagStore, RocksFlagStore, VerificationStatus};
