// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Text helpers shared by the producer and the workers.

use bytes::Bytes;

/// Splits a payload into whitespace-delimited, lower-cased words.
///
/// Payloads are raw bytes; sequences that are not valid UTF-8 are replaced with U+FFFD
/// before splitting, so they count as (part of) a word rather than being dropped.
pub fn tokenize(payload: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(payload)
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Removes a single trailing carriage return so CRLF input yields the same entries as LF input.
pub fn trim_line_ending(mut line: Bytes) -> Bytes {
    if line.last() == Some(&b'\r') {
        line.truncate(line.len() - 1);
    }
    line
}

/// Parses a boolean environment value. Anything other than `false`/`0` (case-insensitive)
/// counts as true.
pub fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_lowercase();
    value != "false" && value != "0"
}
