//! Error types for Sentry core.

use std::{error::Error, fmt, io};

/// Error type for Sentry core operations.
#[derive(Debug)]
pub enum SentryError {
    /// A validation outcome or other input record was malformed.
    InvalidInput(String),
    /// The score normalization denominator was zero or not finite.
    DivisionUndefined,
    /// An underlying I/O error.
    Io(io::Error),
    /// A catch-all error with a message.
    Other(String),
}

impl fmt::Display for SentryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::DivisionUndefined => {
                write!(f, "health score is undefined: maximum possible penalty is zero")
            }
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for SentryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SentryError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Convenience result type for Sentry core.
pub type Result<T> = std::result::Result<T, SentryError>;

#[cfg(test)]
mod tests {
    use super::SentryError;
    use std::error::Error;
    use std::io;

    #[test]
    fn invalid_input_formats_message() {
        let error = SentryError::InvalidInput("missing status".to_string());
        assert_eq!(format!("{error}"), "invalid input: missing status");
    }

    #[test]
    fn division_undefined_formats_message() {
        let error = SentryError::DivisionUndefined;
        assert!(format!("{error}").contains("maximum possible penalty is zero"));
    }

    #[test]
    fn io_error_formats_message_and_exposes_source() {
        let error = SentryError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(format!("{error}"), "io error: boom");
        assert!(error.source().is_some());
    }

    #[test]
    fn from_io_error_maps_variant() {
        let error: SentryError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            SentryError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Io variant, got {other:?}"),
        }
    }
}
