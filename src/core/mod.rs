// src/core/mod.rs
pub mod identity;
pub mod liveness;
pub mod progress;
pub mod services;
