pub mod enqueuer;
pub mod processor;
pub mod tagging;

pub use enqueuer::{EnqueueOutcome, JobEnqueuer};
pub use processor::{derive_tags, ProcessOutcome, TaggingProcessor};
pub use tagging::{JobWorker, WorkerConfig, WorkerState, WorkerStats};
