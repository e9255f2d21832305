// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants;
use crate::errors::SetupError;
use crate::util::parse_flag;
use std::env;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Configuration for a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Log file to read
    pub input: Option<PathBuf>,
    /// Destination of the word-occurrence histogram, truncated on every run
    pub occurrences_path: PathBuf,
    /// Destination of the per-line word counts, appended to
    pub word_count_path: PathBuf,
    /// Truncate the word-count file at startup instead of appending to it
    pub truncate_word_count: bool,
    /// Advisory entry queue capacity (flush trigger)
    pub queue_capacity: usize,
    /// Outstanding signals before the producer blocks
    pub signal_capacity: usize,
    /// Number of workers, 0 means one per available CPU
    pub workers: usize,
    /// Longest accepted line in bytes
    pub max_line_length: usize,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: None,
            occurrences_path: PathBuf::from(constants::OCCURRENCES_FILE_NAME),
            word_count_path: PathBuf::from(constants::WORD_COUNT_FILE_NAME),
            truncate_word_count: false,
            queue_capacity: constants::QUEUE_CAPACITY,
            signal_capacity: constants::SIGNAL_CAPACITY,
            workers: 0,
            max_line_length: constants::MAX_LINE_LENGTH,
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Create configuration from `LOGCOUNT_*` environment variables
    pub fn from_env() -> Result<Self, SetupError> {
        let defaults = Self::default();

        let config = Self {
            input: env::var("LOGCOUNT_INPUT").ok().map(PathBuf::from),
            occurrences_path: env::var("LOGCOUNT_OCCURRENCES_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.occurrences_path),
            word_count_path: env::var("LOGCOUNT_WORD_COUNT_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.word_count_path),
            truncate_word_count: env::var("LOGCOUNT_TRUNCATE_WORD_COUNT")
                .map(|val| parse_flag(&val))
                .unwrap_or(defaults.truncate_word_count),
            queue_capacity: parse_usize("LOGCOUNT_QUEUE_CAPACITY")?
                .unwrap_or(defaults.queue_capacity),
            signal_capacity: parse_usize("LOGCOUNT_SIGNAL_CAPACITY")?
                .unwrap_or(defaults.signal_capacity),
            workers: parse_usize("LOGCOUNT_WORKERS")?.unwrap_or(defaults.workers),
            max_line_length: parse_usize("LOGCOUNT_MAX_LINE_LENGTH")?
                .unwrap_or(defaults.max_line_length),
            log_level: env::var("LOGCOUNT_LOG_LEVEL")
                .map(|val| val.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.queue_capacity == 0 {
            return Err(SetupError::InvalidConfig(
                "Queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.signal_capacity == 0 {
            return Err(SetupError::InvalidConfig(
                "Signal capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_line_length == 0 {
            return Err(SetupError::InvalidConfig(
                "Maximum line length must be greater than 0".to_string(),
            ));
        }

        if self.occurrences_path.as_os_str().is_empty()
            || self.word_count_path.as_os_str().is_empty()
        {
            return Err(SetupError::InvalidConfig(
                "Output file paths cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(SetupError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    /// Number of workers to start, resolving 0 to the available parallelism.
    pub fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
    }
}

fn parse_usize(key: &str) -> Result<Option<usize>, SetupError> {
    match env::var(key) {
        Ok(val) => val.trim().parse::<usize>().map(Some).map_err(|e| {
            SetupError::InvalidConfig(format!("{key} must be a non-negative integer: {e}"))
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.queue_capacity, 4096);
        assert_eq!(config.signal_capacity, 4096);
        assert_eq!(config.max_line_length, 1024 * 1024);
    }

    #[test]
    fn test_validate_zero_capacities() {
        let config = Config {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            signal_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_line_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_output_path() {
        let config = Config {
            word_count_path: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "verbose".to_string(),
            ..Default::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("Invalid log level 'verbose'"));
    }

    #[test]
    fn test_worker_count() {
        let config = Config {
            workers: 3,
            ..Default::default()
        };
        assert_eq!(config.worker_count(), 3);
        assert!(Config::default().worker_count() >= 1);
    }

    #[test]
    fn test_capacities_are_independent() {
        let config = Config {
            queue_capacity: 1024,
            signal_capacity: 4096,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
