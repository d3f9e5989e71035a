//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `SourceError`: Failures of a single auxiliary data source. The chat
//!   pipeline logs these and drops the source; they never reach the caller.

use crate::source::DataSourceKind;
use std::fmt;

/// Errors from auxiliary data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source needs a credential that is not configured.
    NotConfigured { source: DataSourceKind },
    /// The query lacks a parameter this source needs.
    MissingParameter {
        source: DataSourceKind,
        parameter: &'static str,
    },
    /// Connection to the upstream service failed.
    RequestFailed { reason: String },
    /// Upstream answered with a non-success status.
    UpstreamStatus { status: u16 },
    /// Upstream response could not be decoded.
    ResponseParseFailed { reason: String },
    /// The lookup succeeded but found nothing usable.
    NoData { source: DataSourceKind },
    /// Timeout waiting for the source.
    Timeout { seconds: u64 },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConfigured { source } => {
                write!(f, "{source} source is not configured")
            }
            Self::MissingParameter { source, parameter } => {
                write!(f, "{source} source requires a {parameter}")
            }
            Self::RequestFailed { reason } => {
                write!(f, "request failed: {reason}")
            }
            Self::UpstreamStatus { status } => {
                write!(f, "upstream returned HTTP {status}")
            }
            Self::ResponseParseFailed { reason } => {
                write!(f, "failed to parse upstream response: {reason}")
            }
            Self::NoData { source } => write!(f, "no {source} data found"),
            Self::Timeout { seconds } => write!(f, "timed out after {seconds}s"),
        }
    }
}

impl std::error::Error for SourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_error_display() {
        let err = SourceError::NotConfigured {
            source: DataSourceKind::Weather,
        };
        assert_eq!(err.to_string(), "weather source is not configured");

        let err = SourceError::MissingParameter {
            source: DataSourceKind::Market,
            parameter: "commodity",
        };
        assert!(err.to_string().contains("commodity"));
    }

    #[test]
    fn timeout_display() {
        let err = SourceError::Timeout { seconds: 10 };
        assert!(err.to_string().contains("10s"));
    }
}
