//! Shared error types for the services crate.

use thiserror::Error;

/// Errors emitted by manifest fetch and write-back.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManifestError {
    #[error("manifest request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the delivery transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeliveryError {
    #[error("delivery request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
