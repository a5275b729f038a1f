pub mod budget;
pub mod config;
pub mod error;
pub mod job;
pub mod job_queue;
pub mod memory_store;
pub mod models;
pub mod processor;
pub mod simhash;
pub mod traits;
pub mod worker;


pub use budget::ErrorBudget;
pub use config::AppConfig;
pub use error::AppError;
pub use job::{Enqueued, FingerprintJob, JobStatus, WorkerConfig};
pub use job_queue::JobQueue;
pub use memory_store::MemoryStore;
pub use models::{
    CaptureContent, CaptureOutcome, FeatureMap, FingerprintKey, JobSummary, StoredFingerprint,
};
pub use processor::{ProcessorConfig, SnapshotProcessor};
pub use simhash::Fingerprint;
pub use traits::{CaptureFetcher, CaptureIndex, FeatureExtractor, FingerprintStore};
pub use worker::{TracingWorkerReporter, WorkerEvent, WorkerReporter, WorkerService};
