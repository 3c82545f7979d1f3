// src/error.rs

use thiserror::Error;

/// Failures of the row extraction core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The CSV could not be parsed (bad UTF-8, unterminated quote, ragged rows).
    #[error("malformed CSV input: {0}")]
    MalformedInput(String),

    /// The requested row does not exist, or it is the header row.
    #[error("row {index} out of range (table has {rows} rows)")]
    IndexOutOfRange { index: usize, rows: usize },

    /// The header carries no column with the given role.
    #[error("missing column: {0}")]
    MissingColumn(&'static str),

    #[error("no row for country {0:?}")]
    CountryNotFound(String),

    /// Several province rows match and no country-level row exists.
    #[error("country {country:?} matches {matches} province rows")]
    AmbiguousCountry { country: String, matches: usize },
}

/// Failures of the fetch collaborator.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The response envelope or its base64 payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FetchError {
    /// Transport failures and server-side statuses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network { .. } => true,
            FetchError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            FetchError::Decode(_) | FetchError::Io(_) => false,
        }
    }
}
