pub mod core;
pub mod network;
pub mod storage;
pub mod utils;

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    core::{
        identity::session::KycSession,
        liveness::{capture::CaptureDevice, feed::FrameReceiver, LivenessCapture},
        progress::ProgressReporter,
        services::verification::{VerificationRun, VerificationService},
    },
    network::client::{HttpVerificationClient, VerificationApi},
    storage::flags::{FlagStore, RocksFlagStore},
    utils::{
        cancel::CancelToken,
        config::Config,
        error::{KycError, Result},
        metrics::Metrics,
    },
};

/// Owns the capture loop and the verification service for one account.
///
/// At most one verification attempt runs at a time.
pub struct KycPipeline {
    config: Arc<Config>,
    liveness: LivenessCapture,
    verification: VerificationService,
    flags: Arc<dyn FlagStore>,
    metrics: Arc<Metrics>,
    running: Mutex<()>,
}

impl KycPipeline {
    pub fn new(
        config: Config,
        api: Arc<dyn VerificationApi>,
        flags: Arc<dyn FlagStore>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let metrics = Arc::new(Metrics::new());

        info!(hold = ?config.get_hold_duration(), "Initializing liveness capture...");
        let liveness = LivenessCapture::new(&config.liveness, metrics.clone());

        info!("Initializing verification service...");
        let verification = VerificationService::new(api, flags.clone(), metrics.clone());

        Ok(Self {
            config,
            liveness,
            verification,
            flags,
            metrics,
            running: Mutex::new(()),
        })
    }

    /// Production wiring: HTTP backend plus the RocksDB flag store.
    pub fn from_config(config: Config) -> Result<Self> {
        info!("Opening flag store at {}", config.storage.path);
        let flags = Arc::new(RocksFlagStore::open(&config.storage.path)?);

        info!("Initializing verification client for {}", config.api.base_url);
        let api = HttpVerificationClient::new(&config).map_err(|e| {
            KycError::Config(format!("failed to build verification client: {}", e))
        })?;

        Self::new(config, Arc::new(api), flags)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub fn flags(&self) -> Arc<dyn FlagStore> {
        self.flags.clone()
    }

    /// Runs the capture loop until a selfie is taken and attaches it to the
    /// session, replacing any consumed one.
    pub async fn capture_selfie(
        &self,
        session: &mut KycSession,
        frames: &mut FrameReceiver,
        device: &dyn CaptureDevice,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> Result<()> {
        let selfie = self.liveness.run(frames, device, progress, cancel).await?;
        session.attach_selfie(selfie);
        Ok(())
    }

    /// Runs one verification attempt. Fails fast if another one is in flight.
    pub async fn verify(
        &self,
        session: KycSession,
        progress: &ProgressReporter,
        cancel: &CancelToken,
    ) -> std::result::Result<VerificationRun, (KycError, KycSession)> {
        let _guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("Verification already in progress");
                return Err((
                    KycError::InvalidInput("A verification is already in progress.".into()),
                    session,
                ));
            }
        };

        let run = self.verification.verify(session, progress, cancel).await;
        self.metrics.log();
        Ok(run)
    }

    /// Resets local verification bookkeeping. The account email is kept.
    pub async fn reset(&self) -> Result<()> {
        info!("Clearing verification data");
        self.flags.clear_verification_data().await?;
        Ok(())
    }
}
