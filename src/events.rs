// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::catalog::ShowId;

/// Events emitted by the catalog fetcher
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// The show list is being fetched
    FetchingCatalog { url: String },

    /// The show list arrived and was decoded
    CatalogLoaded { show_count: usize },

    /// A detail request went out to the API
    FetchingDetail { show_id: ShowId, url: String },

    /// A detail request joined a fetch that was already in flight
    DetailJoined { show_id: ShowId },

    /// A detail request was answered from the cache
    DetailCached { show_id: ShowId },

    /// A detail fetch completed
    DetailLoaded {
        show_id: ShowId,
        season_count: usize,
        episode_count: usize,
    },

    /// A fetch failed; `show_id` is `None` for the catalog list
    FetchFailed {
        show_id: Option<ShowId>,
        error: String,
    },
}

/// Trait for observing catalog activity.
///
/// Front ends use this to drive spinners or status lines; tests use it to
/// assert on cache behavior.
pub trait CatalogReporter: Send + Sync {
    /// Report an event
    fn report(&self, event: CatalogEvent);
}

/// A shared reference to a catalog reporter
pub type SharedReporter = Arc<dyn CatalogReporter>;

/// A reporter that silently ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl CatalogReporter for NoopReporter {
    fn report(&self, _event: CatalogEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedReporter {
        Arc::new(Self)
    }
}
