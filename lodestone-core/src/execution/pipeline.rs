//! Two-pool query execution
//!
//! One lookup task per [`IndexQuery`] pulls candidate batches on the lookup
//! pool and hands each batch to the evaluation pool. In-flight evaluations
//! are bounded; a lookup task blocks while the bound is reached. The result
//! heap and the in-flight count share one lock so a completing evaluation
//! can never miss a waiting lookup task.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::budget::{Budget, CancellationToken, CountDownLatch};
use super::config::ExecutionConfig;
use crate::error::{Error, Result};
use crate::query::IndexQuery;
use crate::ranking::{ResultPriorityQueue, SearchResultItem};
use crate::structures::LongQueryBuffer;

/// Longest single wait before re-checking cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Scores one batch of candidate ids
pub trait BatchEvaluator: Send + Sync + 'static {
    fn evaluate(&self, batch: &[u64]) -> Vec<SearchResultItem>;
}

impl<F> BatchEvaluator for F
where
    F: Fn(&[u64]) -> Vec<SearchResultItem> + Send + Sync + 'static,
{
    fn evaluate(&self, batch: &[u64]) -> Vec<SearchResultItem> {
        self(batch)
    }
}

/// What one execution produced
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutcome {
    /// Heap contents, best first
    pub results: Vec<SearchResultItem>,
    /// The budget ran out before every cursor was exhausted
    pub timed_out: bool,
    pub batches_evaluated: usize,
    /// Highest number of evaluations in flight at once
    pub max_in_flight: usize,
}

struct ExecutionState {
    in_flight: usize,
    max_in_flight: usize,
    batches_evaluated: usize,
    heap: ResultPriorityQueue,
}

struct Shared {
    state: Mutex<ExecutionState>,
    changed: Condvar,
    budget: Budget,
    cancel: CancellationToken,
    /// Some cursor stopped before it was exhausted
    truncated: AtomicBool,
}

impl Shared {
    fn should_stop(&self) -> bool {
        self.budget.expired() || self.cancel.is_cancelled()
    }
}

/// Owns the lookup and evaluation pools
pub struct QueryExecutor {
    config: ExecutionConfig,
    lookup_pool: Arc<rayon::ThreadPool>,
    evaluation_pool: Arc<rayon::ThreadPool>,
}

impl QueryExecutor {
    pub fn new(config: ExecutionConfig) -> Result<Self> {
        let lookup_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.lookup_threads.max(1))
            .thread_name(|i| format!("lodestone-lookup-{}", i))
            .build()
            .map_err(|e| Error::Internal(format!("lookup pool: {}", e)))?;
        let evaluation_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.evaluation_threads.max(1))
            .thread_name(|i| format!("lodestone-eval-{}", i))
            .build()
            .map_err(|e| Error::Internal(format!("evaluation pool: {}", e)))?;
        Ok(Self {
            config,
            lookup_pool: Arc::new(lookup_pool),
            evaluation_pool: Arc::new(evaluation_pool),
        })
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Run `queries` to exhaustion or until `timeout`, collecting at most
    /// `fetch_size` results.
    ///
    /// Running out of time is not an error: the results gathered so far are
    /// returned. Cancellation through `cancel` returns [`Error::Cancelled`].
    pub fn execute(
        &self,
        queries: Vec<IndexQuery>,
        evaluator: Arc<dyn BatchEvaluator>,
        fetch_size: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let shared = Arc::new(Shared {
            state: Mutex::new(ExecutionState {
                in_flight: 0,
                max_in_flight: 0,
                batches_evaluated: 0,
                heap: ResultPriorityQueue::new(fetch_size),
            }),
            changed: Condvar::new(),
            budget: Budget::new(timeout),
            cancel: cancel.clone(),
            truncated: AtomicBool::new(false),
        });
        let latch = Arc::new(CountDownLatch::new(queries.len()));

        for query in queries {
            let task = LookupTask {
                query,
                shared: shared.clone(),
                latch: latch.clone(),
                evaluator: evaluator.clone(),
                evaluation_pool: self.evaluation_pool.clone(),
                batch_size: self.config.batch_size.max(1),
                max_in_flight: self.config.max_in_flight(),
            };
            self.lookup_pool.spawn(move || task.run());
        }

        // Lookups done or budget spent
        let mut lookups_done = false;
        while !shared.cancel.is_cancelled() {
            let slice = Instant::now() + POLL_INTERVAL.min(shared.budget.remaining());
            if latch.wait_until(slice) {
                lookups_done = true;
                break;
            }
            if shared.budget.expired() {
                break;
            }
        }

        // Evaluations drained, bounded by the budget plus the grace period
        let drain_deadline = shared.budget.deadline().max(Instant::now()) + self.config.drain_grace;
        let mut state = shared.state.lock();
        while state.in_flight > 0 && Instant::now() < drain_deadline {
            let slice = (Instant::now() + POLL_INTERVAL).min(drain_deadline);
            shared.changed.wait_until(&mut state, slice);
        }

        if shared.cancel.is_cancelled() {
            log::debug!(
                "execution cancelled after {:?}, {} evaluations in flight",
                shared.budget.elapsed(),
                state.in_flight
            );
            return Err(Error::Cancelled);
        }

        let timed_out =
            !lookups_done || state.in_flight > 0 || shared.truncated.load(Ordering::Relaxed);
        if timed_out {
            log::debug!(
                "execution timed out after {:?}: {} lookups running, {} evaluations in flight",
                shared.budget.elapsed(),
                latch.count(),
                state.in_flight
            );
        }

        let heap = std::mem::replace(&mut state.heap, ResultPriorityQueue::new(0));
        Ok(ExecutionOutcome {
            results: heap.into_sorted_vec(),
            timed_out,
            batches_evaluated: state.batches_evaluated,
            max_in_flight: state.max_in_flight,
        })
    }
}

struct LookupTask {
    query: IndexQuery,
    shared: Arc<Shared>,
    latch: Arc<CountDownLatch>,
    evaluator: Arc<dyn BatchEvaluator>,
    evaluation_pool: Arc<rayon::ThreadPool>,
    batch_size: usize,
    max_in_flight: usize,
}

impl LookupTask {
    fn run(mut self) {
        let mut buffer = LongQueryBuffer::new(self.batch_size);
        let mut complete = true;
        while self.query.has_more() {
            if self.shared.should_stop() {
                complete = false;
                break;
            }
            self.query.get_more_results(&mut buffer);
            if buffer.is_empty() {
                continue;
            }
            if !self.acquire_slot() {
                complete = false;
                break;
            }
            self.submit(buffer.copy_data());
        }
        if !complete {
            self.shared.truncated.store(true, Ordering::Relaxed);
        }
        self.latch.count_down();
    }

    /// Wait for an evaluation slot; false when the budget ran out or the
    /// execution was cancelled first
    fn acquire_slot(&self) -> bool {
        let shared = &self.shared;
        let mut state = shared.state.lock();
        while state.in_flight >= self.max_in_flight {
            if shared.should_stop() {
                return false;
            }
            let slice = Instant::now() + POLL_INTERVAL.min(shared.budget.remaining());
            shared.changed.wait_until(&mut state, slice);
        }
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        true
    }

    fn submit(&self, batch: Vec<u64>) {
        let shared = self.shared.clone();
        let evaluator = self.evaluator.clone();
        self.evaluation_pool.spawn(move || {
            let results = if shared.cancel.is_cancelled() {
                Vec::new()
            } else {
                catch_unwind(AssertUnwindSafe(|| evaluator.evaluate(&batch))).unwrap_or_else(|_| {
                    log::error!("evaluation of {} candidates panicked", batch.len());
                    Vec::new()
                })
            };

            let mut state = shared.state.lock();
            state.heap.add_all(results);
            state.batches_evaluated += 1;
            state.in_flight -= 1;
            shared.changed.notify_all();
        });
    }
}
