use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Query execution configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Threads pulling candidate batches from cursors
    pub lookup_threads: usize,
    /// Threads scoring candidate batches
    pub evaluation_threads: usize,
    /// In-flight evaluation tasks are capped at this multiple of
    /// `evaluation_threads`
    pub backpressure_factor: usize,
    /// Candidate ids per batch
    pub batch_size: usize,
    /// How long evaluations may keep draining past the deadline
    pub drain_grace: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        let cpus = num_cpus::get().max(1);
        Self {
            lookup_threads: cpus.div_ceil(2).max(1),
            evaluation_threads: cpus,
            backpressure_factor: 4,
            batch_size: 4096,
            drain_grace: Duration::from_millis(50),
        }
    }
}

impl ExecutionConfig {
    pub fn max_in_flight(&self) -> usize {
        (self.backpressure_factor * self.evaluation_threads).max(1)
    }
}
