// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Persistence of aggregated counts to append-only byte sinks.
//!
//! A [`Flusher`] wraps one sink. Flushing always drains the aggregator first and writes second,
//! so a failed write loses that cycle's records but never leaves them behind to be written twice.

use crate::aggregator::Aggregator;
use crate::errors::FlushError;
use std::fmt::Display;
use std::io::Write;
use std::sync::Mutex;
use tracing::{debug, error};

pub type Sink = Box<dyn Write + Send>;

pub struct Flusher {
    name: &'static str,
    sink: Mutex<Sink>,
}

impl std::fmt::Debug for Flusher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flusher").field("name", &self.name).finish()
    }
}

impl Flusher {
    #[must_use]
    pub fn new(name: &'static str, sink: Sink) -> Self {
        Self {
            name,
            sink: Mutex::new(sink),
        }
    }

    /// Drains the per-entry word-count table and appends one `<index> <count>` record per entry.
    ///
    /// The table is reset whether or not the write succeeds. Returns the number of records
    /// written.
    pub fn flush_word_counts(&self, aggregator: &mut Aggregator) -> Result<usize, FlushError> {
        let records = aggregator.consume_word_counts();
        self.write_records(&records)
    }

    /// Drains the histogram and appends one `<word> <count>` record per distinct word.
    pub fn flush_histogram(&self, aggregator: &mut Aggregator) -> Result<usize, FlushError> {
        let records = aggregator.consume_histogram();
        self.write_records(&records)
    }

    fn write_records<K: Display, V: Display>(
        &self,
        records: &[(K, V)],
    ) -> Result<usize, FlushError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut buf = Vec::with_capacity(records.len() * 16);
        for (key, value) in records {
            // writing into a Vec cannot fail
            let _ = writeln!(buf, "{key} {value}");
        }

        #[allow(clippy::expect_used)]
        let mut sink = self.sink.lock().expect("lock poisoned");

        match sink.write_all(&buf).and_then(|()| sink.flush()) {
            Ok(()) => {
                debug!("Flushed {} records to {}", records.len(), self.name);
                Ok(records.len())
            }
            Err(source) => {
                error!(
                    "Failed to flush {} records to {}: {}",
                    records.len(),
                    self.name,
                    source
                );
                Err(FlushError {
                    dropped: records.len(),
                    source,
                })
            }
        }
    }
}

/// In-memory sink whose contents stay readable after it is handed to a [`Flusher`].
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedSink {
    buffer: std::sync::Arc<Mutex<Vec<u8>>>,
}

#[cfg(test)]
impl SharedSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        #[allow(clippy::expect_used)]
        let buffer = self.buffer.lock().expect("lock poisoned");
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Parses every `<key> <value>` line written so far.
    pub fn records(&self) -> Vec<(String, i64)> {
        self.contents()
            .lines()
            .filter_map(|line| {
                let (key, value) = line.rsplit_once(' ')?;
                Some((key.to_string(), value.parse().ok()?))
            })
            .collect()
    }
}

#[cfg(test)]
impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        #[allow(clippy::expect_used)]
        let mut buffer = self.buffer.lock().expect("lock poisoned");
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
