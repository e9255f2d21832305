// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wires the producer, the worker pool and the flushers together for one run.
//!
//! The pool is started first so workers are already waiting when the first signal is raised.
//! A supervisory task joins the pool and reports over a oneshot channel; only after that
//! barrier does the coordinator touch the aggregator to write the histogram and the last
//! word counts.

use crate::aggregator::Aggregator;
use crate::backpressure;
use crate::config::Config;
use crate::entry_queue::EntryQueue;
use crate::errors::{ReadError, SetupError};
use crate::flusher::{Flusher, Sink};
use crate::producer::{Producer, ProducerReport};
use crate::worker::{WorkerContext, WorkerPool, WorkerReport};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::AsyncRead;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Sizing of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub queue_capacity: usize,
    pub signal_capacity: usize,
    pub workers: usize,
    pub max_line_length: usize,
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            queue_capacity: config.queue_capacity,
            signal_capacity: config.signal_capacity,
            workers: config.worker_count(),
            max_line_length: config.max_line_length,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunSummary {
    pub lines_read: i64,
    pub entries_processed: u64,
    /// Entries still queued when the run ended. Only non-zero after cancellation.
    pub entries_unprocessed: usize,
    pub distinct_words: usize,
    pub total_words: i64,
    /// Flushes that wrote at least one record, including the final histogram and word-count flushes.
    pub flushes: u64,
    pub failed_flushes: u64,
    pub empty_pops: u64,
    pub read_error: Option<ReadError>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

pub struct Coordinator {
    options: PipelineOptions,
    cancel_token: CancellationToken,
}

impl Coordinator {
    #[must_use]
    pub fn new(options: PipelineOptions, cancel_token: CancellationToken) -> Self {
        Self {
            options,
            cancel_token,
        }
    }

    /// Runs the pipeline over `input` to completion (or cancellation).
    ///
    /// Per-line word counts are appended to `word_count` as the queue fills up and once more at
    /// the end; the histogram is written to `occurrences` exactly once.
    pub async fn run<R>(self, input: R, occurrences: Sink, word_count: Sink) -> RunSummary
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let start = Instant::now();
        let workers = self.options.workers.max(1);

        let queue = Arc::new(EntryQueue::new(self.options.queue_capacity));
        let (raiser, signals) = backpressure::channel(self.options.signal_capacity);
        let aggregator = Arc::new(Mutex::new(Aggregator::new()));
        let word_count_flusher = Arc::new(Flusher::new("word count", word_count));
        let occurrences_flusher = Flusher::new("occurrences", occurrences);

        let context = WorkerContext {
            queue: Arc::clone(&queue),
            signals,
            aggregator: Arc::clone(&aggregator),
            word_count_flusher: Arc::clone(&word_count_flusher),
            cancel_token: self.cancel_token.clone(),
        };
        let pool = WorkerPool::spawn(workers, &context);
        drop(context);

        let producer = Producer::new(
            input,
            self.options.max_line_length,
            Arc::clone(&queue),
            raiser,
            self.cancel_token.clone(),
        );
        let producer_task = tokio::spawn(producer.run());

        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let report = pool.join().await;
            if done_tx.send(report).is_err() {
                warn!("Coordinator went away before the worker pool drained");
            }
        });

        let producer_report = match producer_task.await {
            Ok(report) => report,
            Err(e) => {
                error!("Producer task failed: {}", e);
                ProducerReport::default()
            }
        };
        debug!("Producer done after {} lines", producer_report.lines_read);

        let worker_report = match done_rx.await {
            Ok(report) => report,
            Err(_) => {
                error!("Worker pool supervisor stopped without reporting");
                WorkerReport::default()
            }
        };

        let mut summary = RunSummary {
            lines_read: producer_report.lines_read,
            entries_processed: worker_report.entries_processed,
            entries_unprocessed: queue.len(),
            distinct_words: 0,
            total_words: 0,
            flushes: worker_report.flushes,
            failed_flushes: worker_report.failed_flushes,
            empty_pops: worker_report.empty_pops,
            read_error: producer_report.read_error,
            cancelled: producer_report.cancelled || self.cancel_token.is_cancelled(),
            elapsed: Duration::ZERO,
        };

        {
            // every worker has stopped, so this lock is uncontended
            #[allow(clippy::expect_used)]
            let mut aggregator = aggregator.lock().expect("lock poisoned");
            summary.distinct_words = aggregator.histogram().len();
            summary.total_words = aggregator.histogram().values().sum();

            match occurrences_flusher.flush_histogram(&mut aggregator) {
                Ok(0) => {}
                Ok(_) => summary.flushes += 1,
                Err(_) => summary.failed_flushes += 1,
            }
            if aggregator.has_word_counts() {
                match word_count_flusher.flush_word_counts(&mut aggregator) {
                    Ok(_) => summary.flushes += 1,
                    Err(_) => summary.failed_flushes += 1,
                }
            }
        }

        summary.elapsed = start.elapsed();
        log_summary(&summary);
        summary
    }
}

fn log_summary(summary: &RunSummary) {
    if summary.cancelled {
        warn!(
            "Run cancelled with {} entries left unprocessed",
            summary.entries_unprocessed
        );
    }
    if let Some(ref e) = summary.read_error {
        warn!("Input was only partially read: {}", e);
    }
    if summary.failed_flushes > 0 {
        error!(
            "{} flush cycles failed, word counts were lost",
            summary.failed_flushes
        );
    }
    info!(
        "Processed {} of {} lines, {} words ({} distinct), {} flushes",
        summary.entries_processed,
        summary.lines_read,
        summary.total_words,
        summary.distinct_words,
        summary.flushes
    );
    info!("total time taken: {:.3}s", summary.elapsed.as_secs_f64());
}

/// Opens the files named by `config` and runs the pipeline over them.
///
/// The word-count file is opened for appending (or truncated first when
/// `truncate_word_count` is set); the occurrences file is always recreated.
pub async fn run_from_config(
    config: &Config,
    cancel_token: CancellationToken,
) -> Result<RunSummary, SetupError> {
    config.validate()?;

    let input_path = config.input.as_ref().ok_or(SetupError::MissingInput)?;
    let input = tokio::fs::File::open(input_path)
        .await
        .map_err(|source| SetupError::OpenInput {
            path: input_path.clone(),
            source,
        })?;

    let word_count = open_word_count(&config.word_count_path, config.truncate_word_count)?;
    let occurrences =
        File::create(&config.occurrences_path).map_err(|source| SetupError::CreateSink {
            path: config.occurrences_path.clone(),
            source,
        })?;

    let options = PipelineOptions::from(config);
    info!(
        "Reading {} with {} workers (queue capacity {}, signal capacity {})",
        input_path.display(),
        options.workers,
        options.queue_capacity,
        options.signal_capacity
    );

    let summary = Coordinator::new(options, cancel_token)
        .run(input, Box::new(occurrences), Box::new(word_count))
        .await;
    Ok(summary)
}

fn open_word_count(path: &Path, truncate: bool) -> Result<File, SetupError> {
    let mut options = OpenOptions::new();
    options.create(true);
    if truncate {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path).map_err(|source| SetupError::CreateSink {
        path: path.to_path_buf(),
        source,
    })
}
