// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Advisory entry queue capacity. Reaching it exactly triggers a word-count flush.
pub const QUEUE_CAPACITY: usize = 4096;

/// Number of outstanding "entry available" signals before the producer blocks.
pub const SIGNAL_CAPACITY: usize = 4096;

/// Longest line accepted by the producer, in bytes.
pub const MAX_LINE_LENGTH: usize = 1024 * 1024;

pub const OCCURRENCES_FILE_NAME: &str = "occurrences.txt";
pub const WORD_COUNT_FILE_NAME: &str = "word_count.txt";

pub const DEFAULT_LOG_LEVEL: &str = "info";
