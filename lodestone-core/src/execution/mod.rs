//! Concurrent query execution: lookup and evaluation pools with
//! backpressure, a time budget and cancellation

mod budget;
mod config;
mod pipeline;

pub use budget::{Budget, CancellationToken, CountDownLatch};
pub use config::ExecutionConfig;
pub use pipeline::{BatchEvaluator, ExecutionOutcome, QueryExecutor};
