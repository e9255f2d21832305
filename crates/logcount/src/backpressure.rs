// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded, payload-less signal stream between the producer and the workers.
//!
//! The producer raises one signal per queued entry and blocks once `capacity` signals are
//! outstanding. Workers consume signals; once the producer closes the stream the pending
//! signals still drain, then every consumer sees [`Signal::Closed`].

use crate::errors::SignalClosed;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Outcome of [`SignalConsumer::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// An entry was pushed to the queue.
    Ready,
    /// The producer closed the stream and every signal has been consumed.
    Closed,
}

/// Creates a signal stream holding at most `capacity` outstanding signals.
///
/// A capacity of zero is treated as one.
#[must_use]
pub fn channel(capacity: usize) -> (SignalRaiser, SignalConsumer) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        SignalRaiser { tx },
        SignalConsumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side. There is exactly one raiser; dropping or closing it closes the stream.
#[derive(Debug)]
pub struct SignalRaiser {
    tx: mpsc::Sender<()>,
}

impl SignalRaiser {
    /// Waits for room in the stream, then raises one signal.
    pub async fn raise(&self) -> Result<(), SignalClosed> {
        self.tx.send(()).await.map_err(|_| SignalClosed)
    }

    /// Number of signals that can be raised before `raise` blocks.
    #[cfg(test)]
    pub fn available(&self) -> usize {
        self.tx.capacity()
    }

    pub fn close(self) {
        drop(self);
    }
}

/// Worker side. Cheap to clone; every worker holds one.
#[derive(Debug, Clone)]
pub struct SignalConsumer {
    rx: Arc<Mutex<mpsc::Receiver<()>>>,
}

impl SignalConsumer {
    /// Waits for the next signal, or for the stream to be closed and drained.
    pub async fn consume(&self) -> Signal {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(()) => Signal::Ready,
            None => Signal::Closed,
        }
    }
}
