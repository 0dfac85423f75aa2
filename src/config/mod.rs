/*!
Configuration of an engine, read from the environment in which it is deployed.

Two structures are read:

- [Config], the knobs the engine itself consumes: the worker thread count and the saturation deadline.
- [LogSettings], the log level and destination, consumed by whichever binary installs a log implementation.

Reading either from the environment is fallible; values which parse but fall outside their accepted range are reported rather than clamped.
*/

use std::path::PathBuf;
use std::time::Duration;

use crate::types::err::ConfigError;

/// The environment variables consumed.
pub mod variables {
    /// The saturation wall-clock limit, in seconds.
    pub const DEADLINE_SEC: &str = "POMAGMA_DEADLINE_SEC";

    /// The log destination, a file path.
    pub const LOG_FILE: &str = "POMAGMA_LOG_FILE";

    /// The log level: 0 = error, 1 = warn, 2 = info, 3 = debug.
    pub const LOG_LEVEL: &str = "POMAGMA_LOG_LEVEL";
}

/// The accepted deadline range, in seconds: one second to one week.
const DEADLINE_RANGE_SEC: std::ops::RangeInclusive<u64> = 1..=604_800;

/// The default deadline, one hour.
const DEFAULT_DEADLINE_SEC: u64 = 3600;

/// The primary configuration structure.
#[derive(Clone, Debug)]
pub struct Config {
    /// The number of worker threads spawned for each scheduler phase.
    pub worker_count: usize,

    /// The wall-clock budget after which cleanup work stops being scheduled.
    pub deadline: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            worker_count: default_worker_count(),
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SEC),
        }
    }
}

impl Config {
    /// The default configuration, overridden by whatever relevant variables the environment defines.
    pub fn from_env() -> Result<Config, ConfigError> {
        let mut config = Config::default();
        if let Ok(value) = std::env::var(variables::DEADLINE_SEC) {
            config.deadline = parse_deadline(&value)?;
        }
        Ok(config)
    }

    /// Replaces the worker count; a count of zero selects the CPU count.
    pub fn with_worker_count(mut self, worker_count: usize) -> Config {
        self.worker_count = match worker_count {
            0 => default_worker_count(),
            count => count,
        };
        self
    }
}

/// The CPU count, floored at one.
fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

/// Parses a deadline value, in seconds.
pub fn parse_deadline(value: &str) -> Result<Duration, ConfigError> {
    let seconds: u64 = value.trim().parse().map_err(|_| ConfigError::Parse {
        variable: variables::DEADLINE_SEC,
        value: value.to_owned(),
    })?;
    if !DEADLINE_RANGE_SEC.contains(&seconds) {
        return Err(ConfigError::DeadlineRange(seconds));
    }
    Ok(Duration::from_secs(seconds))
}

/// Parses a log level value.
pub fn parse_log_level(value: &str) -> Result<log::LevelFilter, ConfigError> {
    let level: u64 = value.trim().parse().map_err(|_| ConfigError::Parse {
        variable: variables::LOG_LEVEL,
        value: value.to_owned(),
    })?;
    match level {
        0 => Ok(log::LevelFilter::Error),
        1 => Ok(log::LevelFilter::Warn),
        2 => Ok(log::LevelFilter::Info),
        3 => Ok(log::LevelFilter::Debug),
        out_of_range => Err(ConfigError::LogLevelRange(out_of_range)),
    }
}

/// Log destination and level, as set in the environment.
#[derive(Clone, Debug)]
pub struct LogSettings {
    /// The maximum level to emit.
    pub level: log::LevelFilter,

    /// Where to write; stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            level: log::LevelFilter::Info,
            file: None,
        }
    }
}

impl LogSettings {
    /// The default settings, overridden by whatever relevant variables the environment defines.
    pub fn from_env() -> Result<LogSettings, ConfigError> {
        let mut settings = LogSettings::default();
        if let Ok(value) = std::env::var(variables::LOG_LEVEL) {
            settings.level = parse_log_level(&value)?;
        }
        if let Ok(value) = std::env::var(variables::LOG_FILE) {
            settings.file = Some(PathBuf::from(value));
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn deadline_accepted() {
        assert_eq!(parse_deadline("1"), Ok(Duration::from_secs(1)));
        assert_eq!(parse_deadline(" 3600 "), Ok(Duration::from_secs(3600)));
        assert_eq!(parse_deadline("604800"), Ok(Duration::from_secs(604_800)));
    }

    #[test]
    fn deadline_rejected() {
        assert_eq!(parse_deadline("0"), Err(ConfigError::DeadlineRange(0)));
        assert_eq!(
            parse_deadline("604801"),
            Err(ConfigError::DeadlineRange(604_801))
        );
        assert!(matches!(
            parse_deadline("an hour"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn log_levels() {
        assert_eq!(parse_log_level("0"), Ok(log::LevelFilter::Error));
        assert_eq!(parse_log_level("1"), Ok(log::LevelFilter::Warn));
        assert_eq!(parse_log_level("2"), Ok(log::LevelFilter::Info));
        assert_eq!(parse_log_level("3"), Ok(log::LevelFilter::Debug));
        assert_eq!(parse_log_level("4"), Err(ConfigError::LogLevelRange(4)));
    }

    #[test]
    fn worker_count_floor() {
        let config = Config::default().with_worker_count(0);
        assert!(config.worker_count >= 1);
    }
}
