use std::fmt;

/// Result type for reinforce operations
pub type Result<T> = std::result::Result<T, ReinforceError>;

/// Main error type for the reinforce library
///
/// Every variant is a caller error surfaced immediately. The numerical core
/// has no recoverable-error path.
#[derive(Debug, Clone, PartialEq)]
pub enum ReinforceError {
    /// Shape-incompatible matrix operation
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Index outside valid bounds
    OutOfRange {
        index: usize,
        len: usize,
    },

    /// Persisted parameter shape disagrees with the live model
    ShapeMismatch {
        name: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Weighted sampling ran off the end of the weights
    SamplingExhausted {
        total: f64,
        draw: f64,
    },

    /// The environment offers no action at this state
    NoAllowedActions {
        state: usize,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),
}

impl fmt::Display for ReinforceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReinforceError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            ReinforceError::OutOfRange { index, len } => {
                write!(f, "Index {} out of range for length {}", index, len)
            }
            ReinforceError::ShapeMismatch { name, expected, actual } => {
                write!(
                    f,
                    "Shape mismatch for '{}': expected {}x{}, got {}x{}",
                    name, expected.0, expected.1, actual.0, actual.1
                )
            }
            ReinforceError::SamplingExhausted { total, draw } => {
                write!(f, "Sampling exhausted: weights sum to {} but drew {}", total, draw)
            }
            ReinforceError::NoAllowedActions { state } => {
                write!(f, "No allowed actions at state {}", state)
            }
            ReinforceError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            ReinforceError::IoError(msg) => write!(f, "IO error: {}", msg),
            ReinforceError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for ReinforceError {}

// Conversion from std::io::Error
impl From<std::io::Error> for ReinforceError {
    fn from(err: std::io::Error) -> Self {
        ReinforceError::IoError(err.to_string())
    }
}

// Conversion from bincode::Error
impl From<bincode::Error> for ReinforceError {
    fn from(err: bincode::Error) -> Self {
        ReinforceError::SerializationError(err.to_string())
    }
}

impl From<serde_json::Error> for ReinforceError {
    fn from(err: serde_json::Error) -> Self {
        ReinforceError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl ReinforceError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        ReinforceError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        ReinforceError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn shape_mismatch<S: Into<String>>(name: S, expected: (usize, usize), actual: (usize, usize)) -> Self {
        ReinforceError::ShapeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }
}
