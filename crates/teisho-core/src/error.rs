use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Conditions that abort the whole batch.
///
/// Everything recoverable (connection failures, 403s, broken tag writes) is
/// recorded on the episode's report instead and never surfaces here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("failed to fetch listing {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("listing {url} returned status {status}")]
    ListingStatus { url: String, status: StatusCode },

    /// The filename date heuristics produced a year outside the accepted
    /// range, which means the filename format is not recognized.
    #[error("bad date for episode {name} (index {discovery_index}): year {year}")]
    BadDate {
        name: String,
        discovery_index: usize,
        year: i32,
    },

    #[error("failed to download {url}: unexpected status {status}")]
    UnexpectedStatus { url: String, status: StatusCode },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BatchError::Io {
            path: path.into(),
            source,
        }
    }
}
