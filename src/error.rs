//! Error taxonomy shared by the marketplace client, the pipeline and the bank scraper.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification used when reporting failed sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Transport failure or non-2xx response.
    Network,
    /// Malformed or unusable response body.
    Parse,
    /// Well-formed response without any data.
    EmptyResult,
    /// Worker task failure inside this process.
    Internal,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{context}: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: wreq::Error,
    },

    #[error("{context}: unexpected status {status}")]
    Status { context: &'static str, status: u16 },

    #[error("{context}: {message}")]
    Parse { context: &'static str, message: String },

    #[error("no listings found for {term:?}")]
    EmptyResult { term: String },

    #[error("unexpected page layout: {0}")]
    UnexpectedHtml(String),

    #[error("worker task failed: {0}")]
    Task(String),
}

impl FetchError {
    pub(crate) fn parse(context: &'static str, message: impl ToString) -> Self {
        FetchError::Parse { context, message: message.to_string() }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Transport { .. } | FetchError::Status { .. } => ErrorKind::Network,
            FetchError::Parse { .. } | FetchError::UnexpectedHtml(_) => ErrorKind::Parse,
            FetchError::EmptyResult { .. } => ErrorKind::EmptyResult,
            FetchError::Task(_) => ErrorKind::Internal,
        }
    }

    /// True when the site answered correctly but had nothing to offer.
    pub fn is_empty_result(&self) -> bool {
        self.kind() == ErrorKind::EmptyResult
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let status = FetchError::Status { context: "search", status: 503 };
        assert_eq!(status.kind(), ErrorKind::Network);

        let parse = FetchError::parse("search", "expected value at line 1");
        assert_eq!(parse.kind(), ErrorKind::Parse);

        let empty = FetchError::EmptyResult { term: "iphone".to_string() };
        assert_eq!(empty.kind(), ErrorKind::EmptyResult);
        assert!(empty.is_empty_result());
        assert!(!parse.is_empty_result());

        let html = FetchError::UnexpectedHtml("missing buy cell".to_string());
        assert_eq!(html.kind(), ErrorKind::Parse);

        assert_eq!(FetchError::Task("panicked".to_string()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_display_messages() {
        let status = FetchError::Status { context: "fetching sites", status: 404 };
        assert_eq!(status.to_string(), "fetching sites: unexpected status 404");

        let empty = FetchError::EmptyResult { term: "iPhone 11".to_string() };
        assert_eq!(empty.to_string(), "no listings found for \"iPhone 11\"");
    }
}
