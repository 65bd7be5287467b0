use std::fmt;

#[derive(Debug)]
pub enum StatsError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(String),
    /// A value fell outside the declared domain of a bounded median.
    OutOfDomain {
        value: i128,
        min: i128,
        max: i128,
        step: i128,
    },
    /// The sequence counter has handed out every number it may issue.
    Capacity(u64),
    PoolClosed,
    NoInput,
    DrainTimeout {
        released: u64,
        submitted: u64,
    },
    Tokenize(String),
    Other(String),
}

impl fmt::Display for StatsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsError::Io(e) => write!(f, "IO error: {}", e),
            StatsError::Json(e) => write!(f, "JSON error: {}", e),
            StatsError::Config(e) => write!(f, "Configuration error: {}", e),
            StatsError::OutOfDomain { value, min, max, step } => write!(
                f,
                "Value {} is outside the median domain [{}, {}] by {}",
                value, min, max, step
            ),
            StatsError::Capacity(limit) => {
                write!(f, "Sequence capacity of {} messages exhausted", limit)
            }
            StatsError::PoolClosed => write!(f, "Worker pool no longer accepts messages"),
            StatsError::NoInput => write!(f, "No readable input sources"),
            StatsError::DrainTimeout { released, submitted } => write!(
                f,
                "Drain timed out after releasing {} of {} messages",
                released, submitted
            ),
            StatsError::Tokenize(e) => write!(f, "Tokenize error: {}", e),
            StatsError::Other(e) => write!(f, "Error: {}", e),
        }
    }
}

impl std::error::Error for StatsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatsError::Io(e) => Some(e),
            StatsError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StatsError {
    fn from(err: std::io::Error) -> Self {
        StatsError::Io(err)
    }
}

impl From<serde_json::Error> for StatsError {
    fn from(err: serde_json::Error) -> Self {
        StatsError::Json(err)
    }
}

impl From<String> for StatsError {
    fn from(err: String) -> Self {
        StatsError::Other(err)
    }
}

impl From<&str> for StatsError {
    fn from(err: &str) -> Self {
        StatsError::Other(err.to_string())
    }
}
