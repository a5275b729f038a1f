use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use wdd_client::{ArchiveClient, CdxIndex, HtmlFeatureExtractor, ReplayFetcher};
use wdd_core::models::FingerprintKey;
use wdd_core::traits::FingerprintStore;
use wdd_core::{
    AppConfig, Fingerprint, JobQueue, JobStatus, MemoryStore, ProcessorConfig, SnapshotProcessor,
    TracingWorkerReporter, WorkerConfig, WorkerService,
};
use wdd_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "wdd", version, about = "Simhash fingerprints of archived web captures")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fingerprint every capture of a URL in one year and print the results
    Fingerprint {
        /// Target URL, as known to the archive
        #[arg(short, long)]
        url: String,

        /// Capture year
        #[arg(short, long)]
        year: i32,

        /// Persist fingerprints to the database (requires DATABASE_URL)
        #[arg(long, default_value_t = false)]
        save: bool,
    },

    /// Run the worker pool against the database job queue until interrupted
    Worker {
        /// Number of worker slots (defaults to WDD_THREADS)
        #[arg(short, long)]
        threads: Option<usize>,
    },

    /// Show stored fingerprints for a URL
    Show {
        /// Target URL
        #[arg(short, long)]
        url: String,

        /// Single 14-digit capture timestamp
        #[arg(short, long)]
        timestamp: Option<String>,
    },

    /// List recent fingerprinting jobs
    Jobs {
        /// Only jobs in this state (pending, running, completed, failed, cancelled)
        #[arg(short, long)]
        status: Option<JobStatus>,

        /// Maximum number of jobs to list
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Print the Hamming distance between two encoded fingerprints
    Compare { a: String, b: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wdd=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fingerprint { url, year, save } => {
            let config = AppConfig::from_env()?;
            if save {
                let db = connect_db().await?;
                cmd_fingerprint(&config, &url, year, db.fingerprint_repo()).await?;
            } else {
                cmd_fingerprint(&config, &url, year, MemoryStore::default()).await?;
            }
        }
        Commands::Worker { threads } => {
            let config = AppConfig::from_env()?;
            let db = connect_db().await?;
            cmd_worker(&config, threads.unwrap_or(config.threads), &db).await?;
        }
        Commands::Show { url, timestamp } => {
            let db = connect_db().await?;
            cmd_show(&url, timestamp.as_deref(), &db).await?;
        }
        Commands::Jobs { status, limit } => {
            let db = connect_db().await?;
            cmd_jobs(status, limit, &db).await?;
        }
        Commands::Compare { a, b } => {
            println!("{}", cmd_compare(&a, &b)?);
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env()
        .context("DATABASE_URL not set. Required for --save, worker, and show.")?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db)
}

fn build_processor<S: FingerprintStore>(
    config: &AppConfig,
    store: S,
) -> Result<SnapshotProcessor<CdxIndex, ReplayFetcher, HtmlFeatureExtractor, S>> {
    let http = ArchiveClient::new(config).context("Failed to create HTTP client")?;
    Ok(SnapshotProcessor::new(
        CdxIndex::new(http.clone(), config)?,
        ReplayFetcher::new(http, config)?,
        HtmlFeatureExtractor::new(),
        store,
        ProcessorConfig::from(config),
    ))
}

/// Cancel `token` on CTRL+C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, stopping after the current capture");
            token.cancel();
        }
    });
}

async fn cmd_fingerprint<S: FingerprintStore>(
    config: &AppConfig,
    url: &str,
    year: i32,
    store: S,
) -> Result<()> {
    let processor = build_processor(config, store)?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let summary = processor.process(url, year, &cancel).await?;
    tracing::info!(
        captures = summary.captures,
        stored = summary.stored,
        skipped = summary.skipped,
        failed = summary.failed,
        "Done"
    );

    let captures: Vec<[String; 2]> = processor
        .store()
        .list_for_url(url)
        .await?
        .into_iter()
        .filter(|f| f.in_year(year))
        .map(|f| [f.timestamp, f.simhash])
        .collect();
    println!("{}", serde_json::to_string_pretty(&captures)?);

    Ok(())
}

async fn cmd_worker(config: &AppConfig, threads: usize, db: &Database) -> Result<()> {
    let processor = build_processor(config, db.fingerprint_repo())?;
    let worker = WorkerService::new(db.job_repo(), processor, WorkerConfig::default());

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    tracing::info!(slots = threads, worker_id = %worker.worker_id(), "Starting worker pool");
    worker
        .run_pool(threads, cancel, Arc::new(TracingWorkerReporter))
        .await?;
    Ok(())
}

async fn cmd_show(url: &str, timestamp: Option<&str>, db: &Database) -> Result<()> {
    let repo = db.fingerprint_repo();

    if let Some(ts) = timestamp {
        wdd_core::models::validate_timestamp(ts)?;
        match repo.get(&FingerprintKey::new(url, ts)).await? {
            Some(simhash) => println!("{simhash}"),
            None => anyhow::bail!("No fingerprint stored for {url} at {ts}"),
        }
        return Ok(());
    }

    let fingerprints = repo.list_for_url(url).await?;
    if fingerprints.is_empty() {
        println!("No fingerprints stored for {url}");
        return Ok(());
    }

    println!("Fingerprints for {url}:\n");
    for f in &fingerprints {
        println!("  {}  {}", f.timestamp, f.simhash);
    }
    println!("\nTotal: {} captures", fingerprints.len());

    Ok(())
}

async fn cmd_jobs(status: Option<JobStatus>, limit: usize, db: &Database) -> Result<()> {
    let jobs = db.job_repo().list_jobs(status, limit).await?;
    if jobs.is_empty() {
        println!("No jobs found");
        return Ok(());
    }

    for job in &jobs {
        let s = &job.summary;
        println!(
            "{}  {:<9}  {} ({})  stored {}/{}, skipped {}, failed {}",
            job.id, job.status, job.url, job.year, s.stored, s.captures, s.skipped, s.failed
        );
        if let Some(err) = &job.error_message {
            println!("    {err}");
        }
    }

    Ok(())
}

fn cmd_compare(a: &str, b: &str) -> Result<u32> {
    let a = Fingerprint::decode(a).context("First fingerprint")?;
    let b = Fingerprint::decode(b).context("Second fingerprint")?;
    Ok(a.hamming_distance(&b))
}
