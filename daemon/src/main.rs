//! lifecert: command-line entry point for registration, proof-of-life
//! verification and participant maintenance.

mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;

use lifecert_liveness::ToggleLivenessChecker;
use lifecert_recognition::FrCoreClient;
use lifecert_store_lmdb::{check_integrity, LmdbEnvironment};
use lifecert_types::SystemClock;
use lifecert_utils::{init_logging, LogFormat};
use lifecert_verification::{
    ParticipantService, RegisterRequest, RegistrationService, UpdateRequest,
    VerificationService, VerifyRequest,
};

use crate::config::ServiceConfig;

#[derive(Parser)]
#[command(name = "lifecert", version, about = "Proof-of-life biometric verification")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "LIFECERT_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB store.
    #[arg(long, env = "LIFECERT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "LIFECERT_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "LIFECERT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// FR Core base URL, e.g. "https://frcore.example/api".
    #[arg(long, env = "FRCORE_BASE_URL")]
    frcore_base_url: Option<String>,

    #[arg(long, env = "FRCORE_UPLOAD_API_KEY", hide_env_values = true)]
    frcore_upload_api_key: Option<String>,

    #[arg(long, env = "FRCORE_RECOGNIZE_API_KEY", hide_env_values = true)]
    frcore_recognize_api_key: Option<String>,

    #[arg(long, env = "FRCORE_TENANT_ID")]
    frcore_tenant_id: Option<String>,

    #[arg(long, env = "FRCORE_TIMEOUT_SECONDS")]
    frcore_timeout_seconds: Option<u64>,

    #[arg(long, env = "VERIFICATION_DISTANCE_THRESHOLD")]
    distance_threshold: Option<f64>,

    #[arg(long, env = "VERIFICATION_SIMILARITY_THRESHOLD")]
    similarity_threshold: Option<f64>,

    /// "false" routes every attempt to manual review.
    #[arg(long, env = "LIVENESS_ENABLED")]
    liveness_enabled: Option<bool>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Enroll a participant's face and store the participant.
    Register {
        #[arg(long)]
        national_id: String,
        #[arg(long)]
        name: String,
        /// Image file to enroll.
        #[arg(long)]
        image: PathBuf,
    },
    /// Run one proof-of-life attempt.
    Verify {
        #[arg(long)]
        participant: String,
        #[arg(long)]
        image: PathBuf,
    },
    /// Latest verification status of a participant.
    Status {
        #[arg(long)]
        participant: String,
    },
    /// Full attempt history of a participant, oldest first.
    History {
        #[arg(long)]
        participant: String,
    },
    /// Participant maintenance.
    Participants {
        #[command(subcommand)]
        action: ParticipantsAction,
    },
    /// Check store consistency and print a report.
    Check,
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[derive(clap::Subcommand)]
enum ParticipantsAction {
    /// List participants, newest first.
    List,
    Show {
        #[arg(long)]
        participant: String,
    },
    /// Change national id and/or display name.
    Update {
        #[arg(long)]
        participant: String,
        #[arg(long)]
        national_id: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a participant with its label mappings and attempts.
    Delete {
        #[arg(long)]
        participant: String,
    },
}

impl Cli {
    /// File (or default) configuration with CLI flags and env vars applied on top.
    fn effective_config(&self) -> anyhow::Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_toml_file(path)?,
            None => ServiceConfig::default(),
        };
        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(url) = &self.frcore_base_url {
            config.frcore.base_url = url.clone();
        }
        if let Some(key) = &self.frcore_upload_api_key {
            config.frcore.upload_api_key = key.clone();
        }
        if let Some(key) = &self.frcore_recognize_api_key {
            config.frcore.recognize_api_key = key.clone();
        }
        if let Some(tenant) = &self.frcore_tenant_id {
            config.frcore.tenant_id = tenant.clone();
        }
        if let Some(secs) = self.frcore_timeout_seconds {
            config.frcore.timeout_secs = secs;
        }
        if let Some(threshold) = self.distance_threshold {
            config.verification.distance_threshold = threshold;
        }
        if let Some(threshold) = self.similarity_threshold {
            config.verification.similarity_threshold = threshold;
        }
        if let Some(enabled) = self.liveness_enabled {
            config.liveness.enabled = enabled;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.effective_config()?;
    init_logging(config.log_format, &config.log_level);
    run(cli.command, &config).await
}

async fn run(command: Command, config: &ServiceConfig) -> anyhow::Result<()> {
    if let Command::Config = command {
        print!("{}", config.redacted().to_toml_string()?);
        return Ok(());
    }

    let store = open_store(config)?;
    let clock = Arc::new(SystemClock);
    let participants = ParticipantService::new(store.clone(), clock.clone());

    match command {
        Command::Register {
            national_id,
            name,
            image,
        } => {
            let bytes = read_image(&image)?;
            let service = RegistrationService::new(store, Arc::new(recognizer(config)?), clock);
            let registration = service
                .register(RegisterRequest {
                    national_id: &national_id,
                    display_name: &name,
                    image: &bytes,
                    image_name: file_name(&image),
                })
                .await?;
            print_json(&registration)
        }
        Command::Verify { participant, image } => {
            let bytes = read_image(&image)?;
            let liveness = ToggleLivenessChecker::new(&config.liveness);
            if !liveness.is_enabled() {
                tracing::warn!("liveness is disabled; every attempt will go to review");
            }
            let service = VerificationService::new(
                store,
                Arc::new(liveness),
                Arc::new(recognizer(config)?),
                clock,
                config.verification.clone(),
            );
            let outcome = service
                .verify(VerifyRequest {
                    participant_id: &participant,
                    image: &bytes,
                    image_name: file_name(&image),
                })
                .await?;
            print_json(&outcome)
        }
        Command::Status { participant } => print_json(&participants.latest_status(&participant)?),
        Command::History { participant } => print_json(&participants.attempts(&participant)?),
        Command::Participants { action } => match action {
            ParticipantsAction::List => print_json(&participants.list()?),
            ParticipantsAction::Show { participant } => print_json(&participants.get(&participant)?),
            ParticipantsAction::Update {
                participant,
                national_id,
                name,
            } => {
                let updated = participants.update(
                    &participant,
                    UpdateRequest {
                        national_id: national_id.as_deref(),
                        display_name: name.as_deref(),
                    },
                )?;
                print_json(&updated)
            }
            ParticipantsAction::Delete { participant } => {
                let summary = participants.delete(&participant)?;
                print_json(&serde_json::json!({
                    "participant_id": participant.trim(),
                    "attempts_removed": summary.attempts_removed,
                    "identities_removed": summary.identities_removed,
                }))
            }
        },
        Command::Check => {
            let report = check_integrity(&store)?;
            print_json(&serde_json::json!({
                "healthy": report.is_healthy(),
                "databases_checked": report.databases_checked,
                "total_entries": report.total_entries,
                "participants": report.participants,
                "identities": report.identities,
                "attempts": report.attempts,
                "errors": report.errors,
            }))?;
            if !report.is_healthy() {
                bail!("store integrity check found {} problem(s)", report.errors.len());
            }
            Ok(())
        }
        Command::Config => Ok(()),
    }
}

fn open_store(config: &ServiceConfig) -> anyhow::Result<Arc<LmdbEnvironment>> {
    let env = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())
        .with_context(|| format!("failed to open store at {}", config.data_dir.display()))?;
    tracing::info!(path = %config.data_dir.display(), "store opened");
    Ok(Arc::new(env))
}

fn recognizer(config: &ServiceConfig) -> anyhow::Result<FrCoreClient> {
    config.validate_frcore()?;
    FrCoreClient::new(&config.frcore).context("failed to build FR Core client")
}

fn read_image(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read image {}", path.display()))
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
