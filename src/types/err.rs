/*!
Error types used in the library.

Precondition violations --- an out-of-range ob, a double insertion, a merge in the wrong order --- are not errors.
Those are debug-checked with `debug_assert!` and panic with the offending site, and the checks are compiled out at release.

The enums here cover the recoverable failures: configuration read from a hostile environment, and resource exhaustion during sampling.
*/

/// Errors when reading configuration from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable whose value could not be parsed as required.
    Parse {
        /// The environment variable at fault.
        variable: &'static str,
        /// The value found.
        value: String,
    },

    /// A deadline outside the accepted range of one second to one week.
    DeadlineRange(u64),

    /// A log level outside the defined range `0..=3`.
    LogLevelRange(u64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse { variable, value } => {
                write!(f, "failed to parse {variable}={value:?}")
            }
            Self::DeadlineRange(seconds) => {
                write!(f, "deadline of {seconds} sec outside 1..=604800")
            }
            Self::LogLevelRange(level) => write!(f, "log level {level} outside 0..=3"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors from the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleError {
    /// No free ob remains; the caller is expected to resize out of core, or to stop sampling.
    Full,
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "carrier is full"),
        }
    }
}

impl std::error::Error for SampleError {}
