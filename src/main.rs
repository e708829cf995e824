use anyhow::Context;
use clap::{Parser, Subcommand};
use escrow_kyc::{
    core::{
        identity::session::KycSession,
        liveness::capture::{capture_and_encode, FileCaptureDevice},
        progress::ProgressReporter,
        services::verification::VerificationRun,
    },
    storage::flags::FlagStore,
    utils::{cancel::cancel_pair, config::Config},
    KycPipeline,
};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "escrow-kyc", about = "Selfie liveness and NIN/BVN identity verification")]
struct Cli {
    /// Extra configuration file layered over config/default and config/local.
    #[arg(long, env = "KYC_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify an identity number against a selfie image.
    Verify {
        /// "nin" or "bvn".
        #[arg(long)]
        mode: String,

        /// The 11-digit identity number.
        #[arg(long)]
        id_number: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// JPEG still to submit as the selfie.
        #[arg(long)]
        selfie: PathBuf,

        /// Account email. Defaults to the stored one.
        #[arg(long)]
        email: Option<String>,
    },
    /// Print the stored verification flags.
    Status,
    /// Store the logged-in account email.
    SetEmail { email: String },
    /// Clear verification status, progress and the verified flag.
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.node.log_level));
    let (writer, _guard) = tracing_appender::non_blocking(std::io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    info!("Starting escrow-kyc v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = KycPipeline::from_config(config).map_err(|e| {
        error!("Failed to initialize pipeline: {}", e);
        e
    })?;

    match cli.command {
        Command::Verify {
            mode,
            id_number,
            first_name,
            last_name,
            selfie,
            email,
        } => {
            let session = KycSession::from_id_entry(&mode, &id_number, &first_name, &last_name)
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            let session = match email {
                Some(email) => session.with_account_email(email),
                None => session,
            };
            run_verify(&pipeline, session, selfie).await
        }
        Command::Status => {
            let flags = pipeline.flags();
            let status = serde_json::json!({
                "verified": flags.get_verified().await?,
                "account_email": flags.get_account_email().await?,
                "verification_status": flags.get_verification_status().await?.map(|s| s.as_str()),
                "kyc_progress": flags.get_kyc_progress().await?,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::SetEmail { email } => {
            if email.trim().is_empty() {
                anyhow::bail!("Email must not be empty");
            }
            pipeline.flags().set_account_email(email.trim()).await?;
            info!("Account email stored");
            Ok(())
        }
        Command::Reset => {
            pipeline.reset().await?;
            println!("Verification data cleared");
            Ok(())
        }
    }
}

async fn run_verify(
    pipeline: &KycPipeline,
    mut session: KycSession,
    selfie: PathBuf,
) -> anyhow::Result<()> {
    let device = FileCaptureDevice::new(&selfie);
    let encoded = capture_and_encode(&device)
        .await
        .with_context(|| format!("Failed to read selfie {}", selfie.display()))?;
    session.attach_selfie(encoded);

    let (progress, mut updates) = ProgressReporter::channel();
    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            println!("{}", update);
        }
    });

    let (handle, token) = cancel_pair();
    let run = {
        let verify = pipeline.verify(session, &progress, &token);
        tokio::pin!(verify);

        tokio::select! {
            run = &mut verify => run,
            _ = signal::ctrl_c() => {
                warn!("Interrupted, cancelling verification");
                handle.cancel();
                verify.await
            }
        }
    };
    drop(progress);
    let _ = printer.await;

    let run = run.map_err(|(e, _)| anyhow::anyhow!(e.user_message()))?;
    match run {
        VerificationRun::Finished { outcome, .. } => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.success {
                anyhow::bail!(outcome.message);
            }
            Ok(())
        }
        VerificationRun::Cancelled { step, .. } => {
            anyhow::bail!("Verification cancelled during {}", step)
        }
    }
}
