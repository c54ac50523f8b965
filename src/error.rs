use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load settings")]
    Settings(#[from] config::ConfigError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered {status}")]
    Status { url: String, status: StatusCode },

    #[error("{tool:?} is not a tool identifier")]
    InvalidTool { tool: String },

    #[error("no tool count found in {text:?}")]
    ToolCount { text: String },

    #[error("no raw record for {tool}; fetch it first")]
    MissingRecord { tool: String },

    #[error("csv output failed")]
    Csv(#[from] csv::Error),
}

impl ScrapeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScrapeError::Io {
            path: path.into(),
            source,
        }
    }

    /// Rate limits, server errors and network hiccups are worth another try.
    pub fn is_transient(&self) -> bool {
        match self {
            ScrapeError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ScrapeError::Request { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> ScrapeError {
        ScrapeError::Status {
            url: "https://example.com".into(),
            status: StatusCode::from_u16(code).unwrap(),
        }
    }

    #[test]
    fn rate_limits_and_server_errors_are_transient() {
        assert!(status(429).is_transient());
        assert!(status(502).is_transient());
        assert!(status(503).is_transient());
    }

    #[test]
    fn client_errors_are_final() {
        assert!(!status(404).is_transient());
        assert!(!status(403).is_transient());
        assert!(!ScrapeError::InvalidTool { tool: "..".into() }.is_transient());
    }
}
