// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::path::PathBuf;

/// Errors that abort a run before any line is processed.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No input file specified")]
    MissingInput,

    #[error("Failed to open input file {path}: {source}")]
    OpenInput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create output file {path}: {source}")]
    CreateSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors that stop the producer mid-file. Entries queued before the error are still
/// aggregated.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Line {line} exceeds the maximum line length of {max_length} bytes")]
    LineTooLong { line: i64, max_length: usize },

    #[error("Failed to read line {line}: {source}")]
    Io {
        line: i64,
        #[source]
        source: io::Error,
    },
}

/// A flush cycle failed to reach the sink. The records it carried are gone.
#[derive(Debug, thiserror::Error)]
#[error("Flush failed, {dropped} records discarded: {source}")]
pub struct FlushError {
    pub dropped: usize,
    #[source]
    pub source: io::Error,
}

/// Raising a signal failed because every consumer has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Signal stream has no consumers")]
pub struct SignalClosed;
