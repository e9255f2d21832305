// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, path::PathBuf, process::ExitCode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logcount::{config::Config, coordinator::run_from_config};

#[tokio::main]
pub async fn main() -> ExitCode {
    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(input) = env::args_os().nth(1) {
        config.input = Some(PathBuf::from(input));
    }

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Setting default subscriber failed: {e}");
    }

    debug!("Logging subsystem enabled");

    let cancel_token = CancellationToken::new();
    let interrupt_token = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping after the current entries");
            interrupt_token.cancel();
        }
    });

    match run_from_config(&config, cancel_token).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Unable to start: {e}");
            ExitCode::FAILURE
        }
    }
}
