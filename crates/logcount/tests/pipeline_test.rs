// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use logcount::{
    config::Config,
    coordinator::{run_from_config, Coordinator, PipelineOptions},
    util::tokenize,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// In-memory sink that stays readable after the coordinator takes ownership of a clone.
#[derive(Clone, Default)]
struct SharedSink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl SharedSink {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }

    fn records(&self) -> Vec<(String, i64)> {
        self.contents()
            .lines()
            .filter_map(|line| {
                let (key, value) = line.rsplit_once(' ')?;
                Some((key.to_string(), value.parse().ok()?))
            })
            .collect()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const VOCABULARY: [&str; 8] = ["alpha", "Beta", "GAMMA", "delta", "the", "The", "fox", "ERROR"];

fn deterministic_log(lines: usize) -> String {
    let mut log = String::new();
    for i in 0..lines {
        let words = i % 9;
        let line: Vec<&str> = (0..words)
            .map(|w| VOCABULARY[(i * 7 + w * 3) % VOCABULARY.len()])
            .collect();
        log.push_str(&line.join(" "));
        log.push('\n');
    }
    log
}

fn reference_histogram(log: &str) -> HashMap<String, i64> {
    let mut histogram = HashMap::new();
    for line in log.lines() {
        for word in tokenize(line.as_bytes()) {
            *histogram.entry(word).or_insert(0) += 1;
        }
    }
    histogram
}

async fn run_in_memory(log: String, options: PipelineOptions) -> (SharedSink, SharedSink) {
    let occurrences = SharedSink::new();
    let word_count = SharedSink::new();
    Coordinator::new(options, CancellationToken::new())
        .run(
            std::io::Cursor::new(log.into_bytes()),
            Box::new(occurrences.clone()),
            Box::new(word_count.clone()),
        )
        .await;
    (occurrences, word_count)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ten_thousand_lines_with_many_workers() {
    let log = deterministic_log(10_000);
    let occurrences = SharedSink::new();
    let word_count = SharedSink::new();

    let summary = Coordinator::new(
        PipelineOptions {
            queue_capacity: 64,
            signal_capacity: 128,
            workers: 8,
            max_line_length: 1024,
        },
        CancellationToken::new(),
    )
    .run(
        std::io::Cursor::new(log.clone().into_bytes()),
        Box::new(occurrences.clone()),
        Box::new(word_count.clone()),
    )
    .await;

    assert_eq!(summary.lines_read, 10_000);
    assert_eq!(summary.entries_processed, 10_000);
    assert_eq!(summary.entries_unprocessed, 0);
    assert_eq!(summary.failed_flushes, 0);

    // every index flushed exactly once
    let mut indices: Vec<i64> = word_count
        .records()
        .iter()
        .map(|(index, _)| index.parse().unwrap())
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, (1..=10_000).collect::<Vec<i64>>());

    // histogram matches a single-threaded tokenization
    let reference = reference_histogram(&log);
    let histogram: HashMap<String, i64> = occurrences.records().into_iter().collect();
    assert_eq!(histogram, reference);

    // per-entry counts and histogram totals agree
    let flushed_total: i64 = word_count.records().iter().map(|(_, count)| count).sum();
    let histogram_total: i64 = histogram.values().sum();
    let reference_total: i64 = reference.values().sum();
    assert_eq!(flushed_total, histogram_total);
    assert_eq!(histogram_total, reference_total);
    assert_eq!(summary.total_words, reference_total);
}

#[tokio::test]
async fn single_worker_matches_many_workers() {
    let log = deterministic_log(500);
    let options = PipelineOptions {
        queue_capacity: 8,
        signal_capacity: 8,
        workers: 1,
        max_line_length: 1024,
    };
    let (single_occurrences, single_counts) = run_in_memory(log.clone(), options).await;
    let (many_occurrences, many_counts) = run_in_memory(
        log,
        PipelineOptions {
            workers: 6,
            ..options
        },
    )
    .await;

    let single: HashMap<String, i64> = single_occurrences.records().into_iter().collect();
    let many: HashMap<String, i64> = many_occurrences.records().into_iter().collect();
    assert_eq!(single, many);

    let mut single_counts = single_counts.records();
    let mut many_counts = many_counts.records();
    single_counts.sort();
    many_counts.sort();
    assert_eq!(single_counts, many_counts);
}

#[tokio::test]
async fn files_append_word_counts_and_recreate_occurrences() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.log");
    std::fs::write(&input, "the Fox\nthe fox ran\n").unwrap();

    let mut config = Config {
        input: Some(input),
        occurrences_path: dir.path().join("occurrences.txt"),
        word_count_path: dir.path().join("word_count.txt"),
        workers: 2,
        ..Default::default()
    };

    for _ in 0..2 {
        let summary = run_from_config(&config, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.entries_processed, 2);
    }

    let occurrences = std::fs::read_to_string(&config.occurrences_path).unwrap();
    let mut occurrences: Vec<&str> = occurrences.lines().collect();
    occurrences.sort_unstable();
    assert_eq!(occurrences, vec!["fox 2", "ran 1", "the 2"]);

    let word_counts = std::fs::read_to_string(&config.word_count_path).unwrap();
    let mut word_counts: Vec<&str> = word_counts.lines().collect();
    word_counts.sort_unstable();
    assert_eq!(word_counts, vec!["1 2", "1 2", "2 3", "2 3"]);

    config.truncate_word_count = true;
    run_from_config(&config, CancellationToken::new())
        .await
        .unwrap();
    let word_counts = std::fs::read_to_string(&config.word_count_path).unwrap();
    assert_eq!(word_counts.lines().count(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn flushed_counts_match_histogram(
        lines in proptest::collection::vec("[a-zA-Z ]{0,40}", 0..200),
        queue_capacity in 1usize..16,
        workers in 1usize..6,
    ) {
        let log: String = lines.iter().map(|line| format!("{line}\n")).collect();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .build()
            .unwrap();
        let (occurrences, word_count) = runtime.block_on(run_in_memory(
            log.clone(),
            PipelineOptions {
                queue_capacity,
                signal_capacity: 4,
                workers,
                max_line_length: 1024,
            },
        ));

        let histogram: HashMap<String, i64> = occurrences.records().into_iter().collect();
        prop_assert_eq!(&histogram, &reference_histogram(&log));

        let records = word_count.records();
        let mut indices: Vec<i64> = records.iter().map(|(index, _)| index.parse().unwrap()).collect();
        indices.sort_unstable();
        prop_assert_eq!(indices, (1..=lines.len() as i64).collect::<Vec<i64>>());

        let flushed_total: i64 = records.iter().map(|(_, count)| count).sum();
        prop_assert_eq!(flushed_total, histogram.values().sum::<i64>());
    }
}
