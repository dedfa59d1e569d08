pub mod config;
pub mod context;
pub mod metrics;
pub mod output;
pub mod retry;
pub mod runner;

pub use config::{LlmProvider, PipelineConfig};
pub use context::RunContext;
pub use metrics::{MetricsSnapshot, RunMetrics};
pub use output::{FailureStage, ItemFailure, ParseErrorRow, PipelineOutput, RunSummary, TableRow};
pub use retry::RetryPolicy;
pub use runner::{Pipeline, load_reference, run_pipeline, text_generator};
