//! Error types for each layer of the crawl.

use std::time::Duration;

use thiserror::Error;

/// Failures raised by a browsing context.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },
    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },
    #[error("browser error: {0}")]
    Browser(String),
    #[error("element not found: {0}")]
    ElementNotFound(String),
}

/// Failures talking to the translation endpoint.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("translation endpoint returned status {0}")]
    Status(u16),
    #[error("malformed translation response: {0}")]
    Malformed(String),
}

/// Failures retrieving a media asset.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(u16),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("{0}")]
    Other(String),
}

/// A required field of a detail page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Id,
    Name,
}

impl std::fmt::Display for RequiredField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredField::Id => write!(f, "id"),
            RequiredField::Name => write!(f, "name"),
        }
    }
}

/// Why one detail-page unit of work did not produce a record.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },
    #[error(transparent)]
    Session(SessionError),
    #[error("{url} has no {field}")]
    MissingRequiredField { url: String, field: RequiredField },
    #[error("existence check failed for {id} ({url}): {source}")]
    StoreRead {
        url: String,
        id: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to store {id} ({url}): {source}")]
    StoreWrite {
        url: String,
        id: String,
        #[source]
        source: StoreError,
    },
}

impl From<SessionError> for ScrapeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NavigationTimeout { url, timeout } => {
                ScrapeError::NavigationTimeout { url, timeout }
            }
            other => ScrapeError::Session(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_timeout_maps_to_scrape_timeout() {
        let err: ScrapeError = SessionError::NavigationTimeout {
            url: "https://example.com/p".to_string(),
            timeout: Duration::from_secs(3),
        }
        .into();
        assert!(matches!(err, ScrapeError::NavigationTimeout { .. }));

        let err: ScrapeError = SessionError::Browser("gone".to_string()).into();
        assert!(matches!(err, ScrapeError::Session(_)));
    }

    #[test]
    fn test_missing_field_message() {
        let err = ScrapeError::MissingRequiredField {
            url: "https://example.com/p".to_string(),
            field: RequiredField::Id,
        };
        assert_eq!(err.to_string(), "https://example.com/p has no id");
    }
}
