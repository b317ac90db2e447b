pub mod batch;
pub mod config;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod recognizer;
pub mod retry;
pub mod sanitize;
pub mod tags;

pub use batch::{BatchDriver, BatchSummary};
pub use config::{Config, Settings};
pub use error::{AutotagError, Result};
pub use metadata::RecognitionResult;
pub use pipeline::{FilePipeline, PipelineOutcome};
pub use recognizer::{RecognitionService, SongrecRecognizer};
pub use retry::{RecognitionClient, Sleeper, ThreadSleeper};
pub use sanitize::sanitize;
pub use tags::{AudioFormat, FormatTagWriters, HttpCoverFetcher, TagWriter, TagWriterSet};
