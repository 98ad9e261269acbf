//! filevault-worker: runs the tagging worker and a few operator commands.

mod cli;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter};

use cli::{CliArgs, Command};
use filevault::config::{load_settings, validate_settings};
use filevault::{
    Database, FileLibrary, JobWorker, QueueStore, RedisStore, ResultStore, Settings,
    SqliteResultStore, WorkerConfig,
};

const DEFAULT_LOG_FILTER: &str = "filevault=info,filevault_worker=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json)?;

    let settings = resolve_settings(&args)?;

    match args.command {
        Command::Work { max_jobs } => run_work(&settings, max_jobs).await,
        Command::Enqueue { file_id } => run_enqueue(&settings, &file_id).await,
        Command::Status { file_id } => run_status(&settings, file_id.as_deref()).await,
    }
}

fn init_logging(json: bool) -> anyhow::Result<()> {
    tracing_log::LogTracer::init().context("Failed to bridge log records")?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        tracing::subscriber::set_global_default(registry.with(fmt::layer().json()))?;
    } else {
        tracing::subscriber::set_global_default(registry.with(fmt::layer()))?;
    }
    Ok(())
}

/// Defaults, then the settings file and environment, then CLI flags.
fn resolve_settings(args: &CliArgs) -> anyhow::Result<Settings> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(redis) = &args.redis {
        settings.redis_url = redis.clone();
    }
    if let Some(database) = &args.database {
        settings.database_path = Some(database.clone());
    }
    validate_settings(&settings)?;
    Ok(settings)
}

fn open_database(settings: &Settings) -> anyhow::Result<Database> {
    let path = settings.resolved_database_path()?;
    Database::open(&path).with_context(|| format!("Failed to open database {}", path.display()))
}

async fn connect_queue(settings: &Settings) -> anyhow::Result<Arc<dyn QueueStore>> {
    let store = RedisStore::connect(settings.redis_config()).await?;
    Ok(Arc::new(store))
}

async fn run_work(settings: &Settings, max_jobs: Option<u64>) -> anyhow::Result<()> {
    let db = open_database(settings)?;
    let store: Arc<dyn ResultStore> = Arc::new(SqliteResultStore::new(db));
    let queue = connect_queue(settings).await?;

    let config = WorkerConfig {
        max_jobs,
        ..settings.worker_config()
    };
    let worker = JobWorker::new(config, store, queue);

    let shutdown = worker.shutdown_flag();
    ctrlc::set_handler(move || {
        if shutdown.load(Ordering::Relaxed) {
            eprintln!("\nForce shutdown!");
            std::process::exit(130);
        }
        eprintln!("\nShutting down after the current job... (press Ctrl+C again to force)");
        shutdown.store(true, Ordering::SeqCst);
    })?;

    info!(
        "Starting worker {} on '{}'",
        worker.config().worker_id,
        worker.config().queue_key
    );
    let stats = worker.run().await?;

    println!(
        "Processed {} entries in {:.1}s: {} tagged, {} orphaned, {} malformed, {} failed",
        stats.received,
        stats.duration.as_secs_f64(),
        stats.tagged,
        stats.orphaned,
        stats.malformed,
        stats.failed
    );
    Ok(())
}

async fn run_enqueue(settings: &Settings, file_id: &str) -> anyhow::Result<()> {
    let library = FileLibrary::new(open_database(settings)?, connect_queue(settings).await?)
        .with_queue_key(settings.queue_key.clone());

    let job = library.requeue(file_id).await?;
    println!("Queued {} ({}) on '{}'", job.file_id, job.file_path, settings.queue_key);
    Ok(())
}

async fn run_status(settings: &Settings, file_id: Option<&str>) -> anyhow::Result<()> {
    let queue = connect_queue(settings).await?;
    let pending = queue.list_len(&settings.queue_key).await?;
    println!("Queue '{}': {} pending", settings.queue_key, pending);

    let Some(file_id) = file_id else {
        return Ok(());
    };

    let db = open_database(settings)?;
    let store = SqliteResultStore::new(db.clone());
    let library = FileLibrary::new(db, queue);

    match store.find_by_id(file_id).await? {
        Some(record) => {
            println!(
                "File {} ({}): {}",
                record.id,
                record.file_name,
                serde_json::to_string(&record.tagging_status())?
            );
            println!("  stored tags: {}", serde_json::to_string(&record.ai_tags)?);
        }
        None => println!("File {}: no record", file_id),
    }

    match library.cached_tags(file_id).await {
        Some(tags) => println!("  cached tags: {}", serde_json::to_string(&tags)?),
        None => println!("  cached tags: none"),
    }
    Ok(())
}
