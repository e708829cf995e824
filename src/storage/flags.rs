// src/storage/flags.rs
use async_trait::async_trait;
use parking_lot::RwLock;
use rocksdb::{Options, DB};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[cfg(test)]
use mockall::automock;

use super::errors::{Result, StorageError};
use crate::core::identity::types::Step;

const USER_VERIFIED_KEY: &[u8] = b"user_verified";
const USER_EMAIL_KEY: &[u8] = b"logged_in_email";
const VERIFICATION_STATUS_KEY: &[u8] = b"verification_status";
const KYC_PROGRESS_KEY: &[u8] = b"kyc_progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Success,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Success => "success",
            VerificationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(VerificationStatus::Pending),
            "success" => Ok(VerificationStatus::Success),
            "failed" => Ok(VerificationStatus::Failed),
            other => Err(StorageError::InvalidFormat(format!(
                "unknown verification status '{}'",
                other
            ))),
        }
    }
}

/// Flags that outlive the process: whether the account is verified, which
/// account is logged in, and KYC bookkeeping.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait FlagStore: Send + Sync {
    async fn get_verified(&self) -> Result<bool>;
    async fn set_verified(&self, verified: bool) -> Result<()>;
    async fn get_account_email(&self) -> Result<Option<String>>;
    async fn set_account_email(&self, email: &str) -> Result<()>;
    async fn get_verification_status(&self) -> Result<Option<VerificationStatus>>;
    async fn set_verification_status(&self, status: VerificationStatus) -> Result<()>;
    async fn get_kyc_progress(&self) -> Result<Option<Step>>;
    async fn set_kyc_progress(&self, step: Step) -> Result<()>;

    /// Drops status, verified flag and progress. The account email stays.
    async fn clear_verification_data(&self) -> Result<()>;
}

/// RocksDB-backed [`FlagStore`], values stored as JSON.
pub struct RocksFlagStore {
    db: DB,
}

impl RocksFlagStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        std::fs::create_dir_all(path.as_ref())?;

        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?;

        Ok(Self { db })
    }

    fn store<T: Serialize + ?Sized>(&self, key: &[u8], value: &T) -> Result<()> {
        let serialized = serde_json::to_vec(value)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;

        self.db
            .put(key, serialized)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    fn retrieve<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        let raw = match self
            .db
            .get(key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))?
        {
            Some(data) => data,
            None => return Ok(None),
        };

        let value = serde_json::from_slice(&raw)
            .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;

        Ok(Some(value))
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db
            .delete(key)
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }

    pub fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| StorageError::DatabaseError(e.to_string()))
    }
}

#[async_trait]
impl FlagStore for RocksFlagStore {
    async fn get_verified(&self) -> Result<bool> {
        Ok(self.retrieve(USER_VERIFIED_KEY)?.unwrap_or(false))
    }

    async fn set_verified(&self, verified: bool) -> Result<()> {
        self.store(USER_VERIFIED_KEY, &verified)
    }

    async fn get_account_email(&self) -> Result<Option<String>> {
        self.retrieve(USER_EMAIL_KEY)
    }

    async fn set_account_email(&self, email: &str) -> Result<()> {
        self.store(USER_EMAIL_KEY, email)
    }

    async fn get_verification_status(&self) -> Result<Option<VerificationStatus>> {
        self.retrieve(VERIFICATION_STATUS_KEY)
    }

    async fn set_verification_status(&self, status: VerificationStatus) -> Result<()> {
        self.store(VERIFICATION_STATUS_KEY, &status)
    }

    async fn get_kyc_progress(&self) -> Result<Option<Step>> {
        self.retrieve(KYC_PROGRESS_KEY)
    }

    async fn set_kyc_progress(&self, step: Step) -> Result<()> {
        self.store(KYC_PROGRESS_KEY, &step)
    }

    async fn clear_verification_data(&self) -> Result<()> {
        self.delete(VERIFICATION_STATUS_KEY)?;
        self.delete(USER_VERIFIED_KEY)?;
        self.delete(KYC_PROGRESS_KEY)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagRecord {
    pub verified: bool,
    pub account_email: Option<String>,
    pub status: Option<VerificationStatus>,
    pub progress: Option<Step>,
}

/// In-process [`FlagStore`] for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryFlagStore {
    record: RwLock<FlagRecord>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account_email(email: &str) -> Self {
        let store = Self::default();
        store.record.write().account_email = Some(email.to_string());
        store
    }

    pub fn snapshot(&self) -> FlagRecord {
        self.record.read().clone()
    }
}

#[async_trait]
impl FlagStore for MemoryFlagStore {
    async fn get_verified(&self) -> Result<bool> {
        Ok(self.record.read().verified)
    }

    async fn set_verified(&self, verified: bool) -> Result<()> {
        self.record.write().verified = verified;
        Ok(())
    }

    async fn get_account_email(&self) -> Result<Option<String>> {
        Ok(self.record.read().account_email.clone())
    }

    async fn set_account_email(&self, email: &str) -> Result<()> {
        self.record.write().account_email = Some(email.to_string());
        Ok(())
    }

    async fn get_verification_status(&self) -> Result<Option<VerificationStatus>> {
        Ok(self.record.read().status)
    }

    async fn set_verification_status(&self, status: VerificationStatus) -> Result<()> {
        self.record.write().status = Some(status);
        Ok(())
    }

    async fn get_kyc_progress(&self) -> Result<Option<Step>> {
        Ok(self.record.read().progress)
    }

    async fn set_kyc_progress(&self, step: Step) -> Result<()> {
        self.record.write().progress = Some(step);
        Ok(())
    }

    async fn clear_verification_data(&self) -> Result<()> {
        let mut record = self.record.write();
        record.verified = false;
        record.status = None;
        record.progress = None;
        Ok(())
    }
}
