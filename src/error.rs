// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::ShowId;

/// Errors that can occur when fetching the catalog or a show's detail
///
/// Cloneable so that one failed request can be handed to every caller that
/// joined it while it was in flight.
#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("Failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: Arc<serde_json::Error>,
    },

    #[error("Response from {url} is not a list of shows")]
    NotAList { url: String },

    #[error("No show with id {0}")]
    NotFound(ShowId),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CatalogError {
    /// True for transport-level failures (connection errors and non-success statuses)
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::HttpStatus { .. })
    }

    /// True when the payload arrived but could not be understood
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::NotAList { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that can occur when reading or writing persisted favorites
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize favorites: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Stored value for '{key}' is corrupt: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}
