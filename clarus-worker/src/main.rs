//! Clarus Worker
//!
//! `clarus-worker` (or `clarus-worker run`) consumes the job queue.
//! `submit` and `status` are operator helpers against the same database.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lapin::Connection;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use clarus_core::{ensure_models_present, FeatureBundle, ProvisionOutcome};
use clarus_worker::gate::{PgSubscriptionGate, StaticGate, SubscriptionGate};
use clarus_worker::queue::{connect_with_retry, AmqpPublisher, JobConsumer};
use clarus_worker::store::{JobStore, PgJobStore};
use clarus_worker::{db, Config, Intake, JobProcessor, QueueError, WorkerResult};

#[derive(Debug, Parser)]
#[command(name = "clarus-worker", version, about = "Clarus traffic scoring worker")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Consume the job queue (default)
    Run,

    /// Store a CSV, create its job and queue it
    Submit {
        /// CSV upload
        file: PathBuf,

        /// Owner of the upload
        #[arg(long)]
        user: Uuid,

        /// Accept the upload without an active subscription
        #[arg(long)]
        skip_subscription_check: bool,
    },

    /// Print a job and its summary as JSON
    Status {
        job_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Submit {
            file,
            user,
            skip_subscription_check,
        } => submit(config, file, user, skip_subscription_check).await,
        Command::Status { job_id } => status(config, job_id).await,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clarus_worker=info,clarus_core=info".into());

    let json = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Startup preconditions: artifacts, bundle, database, broker.
///
/// The connection is returned so it outlives the consumer's channel.
async fn start_consumer(config: &Config) -> WorkerResult<(Connection, JobConsumer)> {
    match ensure_models_present(
        &config.model_dir,
        &config.bundle_paths.all(),
        &config.model_source_dir,
    )? {
        ProvisionOutcome::AlreadyPresent => {}
        ProvisionOutcome::Seeded(n) => {
            tracing::info!(copied = n, model_dir = %config.model_dir.display(), "Model volume seeded")
        }
    }

    let bundle = Arc::new(FeatureBundle::load(&config.bundle_paths)?);

    tracing::info!(database = %config.redacted_database_url(), "Connecting to database");
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pool));
    let processor = Arc::new(JobProcessor::new(store, bundle, config.uploads_dir.clone()));

    tracing::info!(broker = %config.redacted_rabbitmq_url(), "Connecting to broker");
    let connection = connect_with_retry(
        &config.rabbitmq_url,
        config.broker_connect_attempts,
        config.broker_retry_delay,
    )
    .await?;
    let channel = connection.create_channel().await.map_err(QueueError::from)?;

    Ok((connection, JobConsumer::new(channel, &config.queue_name, processor)))
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(environment = %config.environment, "Clarus worker starting...");

    let (_connection, consumer) = start_consumer(&config)
        .await
        .context("Worker startup failed")?;

    tokio::select! {
        result = consumer.run() => {
            result.context("Job consumer stopped")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
    }

    Ok(())
}

async fn submit(
    config: Config,
    file: PathBuf,
    user_id: Uuid,
    skip_subscription_check: bool,
) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&pool).await?;

    let gate: Arc<dyn SubscriptionGate> = if skip_subscription_check {
        Arc::new(StaticGate(true))
    } else {
        Arc::new(PgSubscriptionGate::new(pool.clone()))
    };

    let connection = connect_with_retry(
        &config.rabbitmq_url,
        config.broker_connect_attempts,
        config.broker_retry_delay,
    )
    .await?;
    let publisher = Arc::new(AmqpPublisher::new(connection, &config.queue_name).await?);

    let intake = Intake::new(
        Arc::new(PgJobStore::new(pool)),
        publisher,
        gate,
        config.uploads_dir.clone(),
    );

    let accepted = intake.accept_upload(user_id, &filename, &bytes).await?;
    println!("{}", serde_json::to_string_pretty(&accepted)?);
    Ok(())
}

async fn status(config: Config, job_id: Uuid) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    let store = PgJobStore::new(pool);

    let job = store
        .find_job(job_id)
        .await?
        .with_context(|| format!("Job {job_id} not found"))?;
    let summary = store.find_summary(job_id).await?;

    let report = serde_json::json!({
        "job": job,
        "summary": summary,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
