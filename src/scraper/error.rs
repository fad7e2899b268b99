//! Shared error type for fetching and extraction.

use thiserror::Error;

/// Failure while fetching a page or extracting fields from it.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    // Transport
    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Failed to read response body from {url}: {source}")]
    BodyRead { url: String, source: reqwest::Error },

    // Page layout
    #[error("Unexpected page structure at {url}: {field}: {reason}")]
    Structure {
        url: String,
        field: &'static str,
        reason: String,
    },

    #[error("{operation} is not supported")]
    Unsupported { operation: &'static str },
}

impl ScrapeError {
    /// True for transport failures (unreachable host, timeout, non-success status).
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            ScrapeError::Network { .. }
                | ScrapeError::HttpStatus { .. }
                | ScrapeError::BodyRead { .. }
        )
    }
}

/// A mandatory field is missing or unparsable in a fetched document.
///
/// Extractors are pure and do not know which URL they are reading; callers attach it with
/// [`StructureError::at`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct StructureError {
    pub field: &'static str,
    pub reason: String,
}

impl StructureError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            reason: "element not found".to_string(),
        }
    }

    pub fn unparsable(field: &'static str, text: &str) -> Self {
        Self {
            field,
            reason: format!("could not parse {:?}", text.trim()),
        }
    }

    pub fn at(self, url: &str) -> ScrapeError {
        ScrapeError::Structure {
            url: url.to_string(),
            field: self.field,
            reason: self.reason,
        }
    }
}
