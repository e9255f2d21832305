// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ingestion side of the pipeline.
//!
//! The producer is the only writer to the [`EntryQueue`] and the only raiser of signals. It reads
//! the input one line at a time, tags each line with the next index, pushes it and raises one
//! signal. Whatever ends the read loop (end of input, a read error or cancellation), the signal
//! stream is closed on the way out so the workers can drain and stop.

use crate::backpressure::SignalRaiser;
use crate::entry_queue::{Entry, EntryQueue};
use crate::errors::ReadError;
use crate::util::trim_line_ending;
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// What the producer did before it stopped.
#[derive(Debug, Default)]
pub struct ProducerReport {
    /// Number of lines pushed to the queue. Equal to the last index handed out.
    pub lines_read: i64,
    /// The error that stopped reading early, if any.
    pub read_error: Option<ReadError>,
    pub cancelled: bool,
}

pub struct Producer<R> {
    lines: FramedRead<R, AnyDelimiterCodec>,
    queue: Arc<EntryQueue>,
    raiser: SignalRaiser,
    cancel_token: CancellationToken,
    max_line_length: usize,
}

impl<R: AsyncRead + Unpin> Producer<R> {
    /// Creates a producer over `reader`. Lines longer than `max_line_length` bytes stop the
    /// read with [`ReadError::LineTooLong`].
    #[must_use]
    pub fn new(
        reader: R,
        max_line_length: usize,
        queue: Arc<EntryQueue>,
        raiser: SignalRaiser,
        cancel_token: CancellationToken,
    ) -> Self {
        // one extra byte so a CRLF line at the limit still fits before `\r` is trimmed
        let codec = AnyDelimiterCodec::new_with_max_length(
            b"\n".to_vec(),
            Vec::new(),
            max_line_length.saturating_add(1),
        );
        Self {
            lines: FramedRead::new(reader, codec),
            queue,
            raiser,
            cancel_token,
            max_line_length,
        }
    }

    /// Reads the whole input, then closes the signal stream.
    pub async fn run(mut self) -> ProducerReport {
        let mut report = ProducerReport::default();

        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                next = self.lines.next() => next,
            };

            let line = match next {
                None => break,
                Some(Ok(line)) => self.payload(report.lines_read + 1, line),
                Some(Err(e)) => Err(self.read_error(report.lines_read + 1, e)),
            };
            let line = match line {
                Ok(line) => line,
                Err(error) => {
                    error!("Stopped reading input: {}", error);
                    report.read_error = Some(error);
                    break;
                }
            };

            report.lines_read += 1;
            self.queue.push(Entry::new(report.lines_read, line));

            let raised = tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                raised = self.raiser.raise() => raised,
            };
            if let Err(e) = raised {
                warn!("Stopped reading input after line {}: {}", report.lines_read, e);
                break;
            }
        }

        self.raiser.close();
        debug!(
            "Producer finished after {} lines (cancelled: {})",
            report.lines_read, report.cancelled
        );
        report
    }

    /// Strips the line ending and enforces the length limit on what remains.
    fn payload(&self, line: i64, bytes: Bytes) -> Result<Bytes, ReadError> {
        let payload = trim_line_ending(bytes);
        if payload.len() > self.max_line_length {
            return Err(ReadError::LineTooLong {
                line,
                max_length: self.max_line_length,
            });
        }
        Ok(payload)
    }

    fn read_error(&self, line: i64, error: AnyDelimiterCodecError) -> ReadError {
        match error {
            AnyDelimiterCodecError::MaxChunkLengthExceeded => ReadError::LineTooLong {
                line,
                max_length: self.max_line_length,
            },
            AnyDelimiterCodecError::Io(source) => ReadError::Io { line, source },
        }
    }
}
