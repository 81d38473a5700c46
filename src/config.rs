// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use directories::ProjectDirs;
use url::Url;

/// Public catalog API used when no other URL is configured
pub const DEFAULT_API_URL: &str = "https://podcast-api.netlify.app/";

/// Shows per page in the paged list
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Settings for a browsing session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Root of the catalog API; the list lives here, details under `id/{id}`
    pub base_url: Url,
    pub page_size: usize,
    /// Where favorites are persisted
    pub data_dir: PathBuf,
}

impl ClientConfig {
    /// Platform data directory (XDG on Linux, AppData on Windows)
    pub fn default_data_dir() -> PathBuf {
        ProjectDirs::from("", "", "podshelf")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".podshelf"))
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            page_size: DEFAULT_PAGE_SIZE,
            data_dir: Self::default_data_dir(),
        }
    }
}
