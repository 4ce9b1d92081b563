//! Error types for ar-symplectic
//!
//! Every failure mode of the integrator is reported through [`Error`];
//! nothing in the library aborts the process.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// ar-symplectic error types
#[derive(Error, Debug)]
pub enum Error {
    /// A manager or interaction parameter is out of range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Input data (particles, buffers, orders) cannot be used
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file value rejected by validation
    #[error("Configuration error in `{field}`: {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration file could not be parsed
    #[error("TOML parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Particle file could not be parsed
    #[error("Parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// Integration used more steps than allowed
    #[error("Step count exceeded limit {limit} at time {time} (time_end {time_end})\nIncrease step_count_max or check the initial conditions")]
    StepCountExceeded {
        /// Configured step limit
        limit: u64,
        /// Time reached when the limit was hit
        time: f64,
        /// Requested end time
        time_end: f64,
    },

    /// Physical time step fell below the configured minimum
    #[error("Time step {dt} below minimum {dt_min} at time {time}\nThe energy error criterion cannot be satisfied")]
    TimeStepTooSmall {
        /// Last physical time step
        dt: f64,
        /// Configured minimum
        dt_min: f64,
        /// Time reached
        time: f64,
    },

    /// Checkpoint header or payload is invalid
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Checkpoint encoding failed
    #[error("Checkpoint encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// Checkpoint decoding failed
    #[error("Checkpoint decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let error = Error::invalid_parameter("ds_scale", "must be positive");
        let error_str = format!("{error}");
        assert!(error_str.contains("ds_scale"));
        assert!(error_str.contains("must be positive"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io.into();
        assert!(matches!(error, Error::Io(_)));
    }
}
