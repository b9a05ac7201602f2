//! Error types for sigmet-raw
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in sigmet-raw
#[derive(Debug, Error)]
pub enum SigmetError {
    /// Byte source ended mid-record or mid-field
    #[error("truncated stream: {0}")]
    TruncatedStream(String),

    /// A header value violates a declared range
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Data mask bit with no registered descriptor
    #[error("bit {0} of the data mask is not a known Sigmet data type")]
    UnknownDataType(u32),

    /// OS-level read/write/socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed request, wrong ancillary-data shape, or unsupported subcommand
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Sweep index out of range, unknown abbreviation, bad sweep specifier
    #[error("bad argument: {0}")]
    BadArgument(String),

    /// Failure reported by the daemon over the error channel
    #[error("{0}")]
    Daemon(String),

    /// Allocation failed or fd limit reached
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Result type alias for sigmet-raw operations
pub type Result<T> = std::result::Result<T, SigmetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_stream_display() {
        let err = SigmetError::TruncatedStream("ingest header".to_string());
        assert_eq!(err.to_string(), "truncated stream: ingest header");
    }

    #[test]
    fn test_malformed_header_display() {
        let err = SigmetError::MalformedHeader("41 sweeps".to_string());
        assert_eq!(err.to_string(), "malformed header: 41 sweeps");
    }

    #[test]
    fn test_unknown_data_type_display() {
        let err = SigmetError::UnknownDataType(77);
        assert!(err.to_string().contains("77"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: SigmetError = io_err.into();
        assert!(matches!(err, SigmetError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_daemon_error_is_bare_message() {
        let err = SigmetError::Daemon("DB_FOO is not a Sigmet data type.".to_string());
        assert_eq!(err.to_string(), "DB_FOO is not a Sigmet data type.");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_err() -> Result<()> {
            Err(SigmetError::BadArgument("sweep 9".to_string()))
        }
        assert!(returns_err().is_err());
    }
}
