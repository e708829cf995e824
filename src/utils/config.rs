// src/utils/config.rs
use serde::Deserialize;
use std::time::Duration;
use config::{
    builder::DefaultState, Config as ConfigLib, ConfigBuilder, ConfigError, Environment, File,
};
use crate::utils::error::{KycError, Result};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BASE_URL: &str = "https://api.escrow.example/kyc/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LIVENESS_PATH: &str = "verify_liveness.php";
const DEFAULT_NIN_PATH: &str = "verify_nin.php";
const DEFAULT_BVN_PATH: &str = "verify_bvn.php";
const DEFAULT_FINAL_PATH: &str = "final_verify.php";
const DEFAULT_STORAGE_PATH: &str = "data/user_prefs";
const DEFAULT_HOLD_MS: u64 = 3000;
const DEFAULT_TARGET_CENTER_X: f64 = 0.5;
const DEFAULT_TARGET_CENTER_Y: f64 = 0.65;
const DEFAULT_TARGET_RADIUS: f64 = 0.40;
const DEFAULT_MIN_RADIUS_Y: f64 = 0.22;
const DEFAULT_MAX_RADIUS_Y: f64 = 0.50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub liveness: LivenessConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub liveness_path: String,
    pub nin_path: String,
    pub bvn_path: String,
    pub final_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LivenessConfig {
    pub hold_ms: u64,
    pub target_center_x: f64,
    pub target_center_y: f64,
    pub target_radius: f64,
    pub min_radius_y: f64,
    pub max_radius_y: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            liveness_path: DEFAULT_LIVENESS_PATH.to_string(),
            nin_path: DEFAULT_NIN_PATH.to_string(),
            bvn_path: DEFAULT_BVN_PATH.to_string(),
            final_path: DEFAULT_FINAL_PATH.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORAGE_PATH.to_string(),
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            hold_ms: DEFAULT_HOLD_MS,
            target_center_x: DEFAULT_TARGET_CENTER_X,
            target_center_y: DEFAULT_TARGET_CENTER_Y,
            target_radius: DEFAULT_TARGET_RADIUS,
            min_radius_y: DEFAULT_MIN_RADIUS_Y,
            max_radius_y: DEFAULT_MAX_RADIUS_Y,
        }
    }
}

impl Config {
    /// Loads `config/default` and `config/local` (both optional) and then
    /// `KYC__SECTION__KEY` environment overrides.
    pub fn new() -> Result<Self> {
        Self::load(None)
    }

    /// Like [`Config::new`], with an extra config file layered on top of the
    /// default files.
    pub fn load(extra_file: Option<&str>) -> Result<Self> {
        let mut builder = Self::with_defaults()?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::with_name(path));
        }

        let config = builder
            // Override with environment variables (e.g., KYC__API__BASE_URL)
            .add_source(Environment::with_prefix("KYC").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn with_defaults() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        ConfigLib::builder()
            .set_default("node.log_level", DEFAULT_LOG_LEVEL)?
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("api.timeout_secs", DEFAULT_TIMEOUT_SECS)?
            .set_default("api.connect_timeout_secs", DEFAULT_CONNECT_TIMEOUT_SECS)?
            .set_default("api.liveness_path", DEFAULT_LIVENESS_PATH)?
            .set_default("api.nin_path", DEFAULT_NIN_PATH)?
            .set_default("api.bvn_path", DEFAULT_BVN_PATH)?
            .set_default("api.final_path", DEFAULT_FINAL_PATH)?
            .set_default("storage.path", DEFAULT_STORAGE_PATH)?
            .set_default("liveness.hold_ms", DEFAULT_HOLD_MS)?
            .set_default("liveness.target_center_x", DEFAULT_TARGET_CENTER_X)?
            .set_default("liveness.target_center_y", DEFAULT_TARGET_CENTER_Y)?
            .set_default("liveness.target_radius", DEFAULT_TARGET_RADIUS)?
            .set_default("liveness.min_radius_y", DEFAULT_MIN_RADIUS_Y)?
            .set_default("liveness.max_radius_y", DEFAULT_MAX_RADIUS_Y)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate api configuration
        if self.api.base_url.trim().is_empty() {
            return Err(KycError::Config("api.base_url must be set".into()));
        }
        if self.api.timeout_secs == 0 || self.api.connect_timeout_secs == 0 {
            return Err(KycError::Config("api timeouts must be greater than 0".into()));
        }

        // Validate storage configuration
        if self.storage.path.trim().is_empty() {
            return Err(KycError::Config("storage.path must be set".into()));
        }

        // Validate liveness configuration
        let liveness = &self.liveness;
        if liveness.hold_ms == 0 {
            return Err(KycError::Config("liveness.hold_ms must be greater than 0".into()));
        }
        if liveness.target_radius <= 0.0 || liveness.target_radius > 1.0 {
            return Err(KycError::Config("liveness.target_radius must be in (0, 1]".into()));
        }
        if liveness.min_radius_y >= liveness.max_radius_y {
            return Err(KycError::Config(
                "liveness.min_radius_y must be below liveness.max_radius_y".into(),
            ));
        }

        Ok(())
    }

    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn get_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.api.connect_timeout_secs)
    }

    pub fn get_hold_duration(&self) -> Duration {
        Duration::from_millis(self.liveness.hold_ms)
    }
}

impl From<ConfigError> for KycError {
    fn from(error: ConfigError) -> Self {
        KycError::Config(error.to_string())
    }
}
