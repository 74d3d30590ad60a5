use thiserror::Error;

pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Debug, Error, PartialEq)]
pub enum ProxyError {
    #[error("Required series '{0}' is missing or empty")]
    MissingSeries(&'static str),
    #[error("Series '{name}' has length {found}, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("Unknown window reducer '{0}', expected one of mean, median, min, max")]
    UnknownReducer(String),
    #[error("Timestamps must be strictly increasing, violated at index {0}")]
    NonIncreasingTimestamps(usize),
    #[error("Timestamp at index {0} is not finite")]
    NonFiniteTimestamp(usize),
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Fails with [ProxyError::LengthMismatch] unless `found == expected`.
pub(crate) fn ensure_length(name: &'static str, expected: usize, found: usize) -> ProxyResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(ProxyError::LengthMismatch {
            name,
            expected,
            found,
        })
    }
}
