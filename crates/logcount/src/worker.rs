// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Worker pool that folds queued entries into the shared [`Aggregator`].

use crate::aggregator::Aggregator;
use crate::backpressure::{Signal, SignalConsumer};
use crate::entry_queue::{Entry, EntryQueue};
use crate::flusher::Flusher;
use crate::util::tokenize;
use std::ops::AddAssign;
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Per-worker counters, summed across the pool when it drains.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerReport {
    pub entries_processed: u64,
    pub words_counted: u64,
    pub flushes: u64,
    pub failed_flushes: u64,
    pub empty_pops: u64,
}

impl AddAssign for WorkerReport {
    fn add_assign(&mut self, other: Self) {
        self.entries_processed += other.entries_processed;
        self.words_counted += other.words_counted;
        self.flushes += other.flushes;
        self.failed_flushes += other.failed_flushes;
        self.empty_pops += other.empty_pops;
    }
}

/// Everything a worker shares with its siblings and the coordinator.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub queue: Arc<EntryQueue>,
    pub signals: SignalConsumer,
    pub aggregator: Arc<Mutex<Aggregator>>,
    pub word_count_flusher: Arc<Flusher>,
    pub cancel_token: CancellationToken,
}

pub struct Worker {
    id: usize,
    context: WorkerContext,
    report: WorkerReport,
}

impl Worker {
    #[must_use]
    pub fn new(id: usize, context: WorkerContext) -> Self {
        Self {
            id,
            context,
            report: WorkerReport::default(),
        }
    }

    /// Consumes signals until the stream is closed and drained, or the run is cancelled.
    pub async fn run(mut self) -> WorkerReport {
        trace!("Worker {} started", self.id);

        loop {
            let signal = tokio::select! {
                biased;
                () = self.context.cancel_token.cancelled() => break,
                signal = self.context.signals.consume() => signal,
            };
            if signal == Signal::Closed {
                break;
            }

            match self.context.queue.pop() {
                Some(entry) => self.process(entry),
                None => self.report.empty_pops += 1,
            }
        }

        trace!(
            "Worker {} stopped after {} entries",
            self.id,
            self.report.entries_processed
        );
        self.report
    }

    fn process(&mut self, entry: Entry) {
        let words = tokenize(&entry.payload);

        #[allow(clippy::expect_used)]
        let mut aggregator = self.context.aggregator.lock().expect("lock poisoned");
        let word_count = aggregator.insert(entry.index, &words);
        self.report.entries_processed += 1;
        self.report.words_counted += word_count as u64;

        if self.context.queue.is_full() {
            debug!(
                "Worker {} observed a full queue, flushing {} word counts",
                self.id,
                aggregator.pending_word_counts()
            );
            match self
                .context
                .word_count_flusher
                .flush_word_counts(&mut aggregator)
            {
                Ok(_) => self.report.flushes += 1,
                Err(e) => {
                    error!("Worker {} lost a flush cycle: {}", self.id, e);
                    self.report.failed_flushes += 1;
                }
            }
        }
    }
}

/// Fixed-size set of workers sharing one [`WorkerContext`].
pub struct WorkerPool {
    workers: JoinSet<WorkerReport>,
}

impl WorkerPool {
    /// Spawns `size` workers on the current runtime. They wait for signals immediately.
    #[must_use]
    pub fn spawn(size: usize, context: &WorkerContext) -> Self {
        let mut workers = JoinSet::new();
        for id in 0..size {
            workers.spawn(Worker::new(id, context.clone()).run());
        }
        debug!("Started {} workers", size);
        Self { workers }
    }

    /// Waits for every worker to stop and sums their reports.
    pub async fn join(mut self) -> WorkerReport {
        let mut total = WorkerReport::default();
        while let Some(result) = self.workers.join_next().await {
            match result {
                Ok(report) => total += report,
                Err(e) => error!("Worker task failed: {}", e),
            }
        }
        total
    }
}
