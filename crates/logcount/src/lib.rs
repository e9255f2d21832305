// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Concurrent log aggregation pipeline.
//!
//! A single producer reads lines from a log, hands them to a pool of workers through an
//! [`entry_queue::EntryQueue`] paired with a bounded [`backpressure`] signal stream, and the
//! workers fold every line into a shared [`aggregator::Aggregator`]. Per-line word counts are
//! flushed periodically through a [`flusher::Flusher`]; the word-occurrence histogram is written
//! once by the [`coordinator::Coordinator`] when the run completes.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod aggregator;
pub mod backpressure;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod entry_queue;
pub mod errors;
pub mod flusher;
pub mod producer;
pub mod util;
pub mod worker;
