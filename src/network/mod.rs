// src/network/mod.rs
pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpVerificationClient, VerificationApi};
pub use error::NetworkError;
pub use types::*;
