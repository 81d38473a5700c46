// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use url::Url;

use crate::error::CatalogError;
use crate::events::{CatalogEvent, NoopReporter, SharedReporter};
use crate::http::HttpClient;

use super::model::{Show, ShowId};
use super::parse::{parse_show_detail, parse_show_list};

/// Result of a detail fetch, shared by every caller that joined it
pub type DetailOutcome = Result<Arc<Show>, CatalogError>;

type InFlight = Shared<BoxFuture<'static, DetailOutcome>>;

enum DetailSlot {
    Ready(Arc<Show>),
    Pending { request: u64, future: InFlight },
}

#[derive(Default)]
struct DetailCache {
    slots: HashMap<ShowId, DetailSlot>,
    next_request: u64,
}

/// Fetches the show list and per-show detail from the catalog API
///
/// Detail responses are cached per show for the lifetime of the fetcher.
/// Concurrent requests for the same show share a single HTTP request. A
/// failed list fetch never discards the last good list.
pub struct CatalogFetcher<C> {
    client: Arc<C>,
    base_url: Url,
    reporter: SharedReporter,
    shows: Mutex<Option<Arc<Vec<Show>>>>,
    details: Mutex<DetailCache>,
}

impl<C: HttpClient + 'static> CatalogFetcher<C> {
    /// Create a fetcher rooted at `base_url`
    ///
    /// The list lives at the base URL itself and details at `{base}id/{id}`.
    pub fn new(client: C, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Self {
            client: Arc::new(client),
            base_url,
            reporter: NoopReporter::shared(),
            shows: Mutex::new(None),
            details: Mutex::new(DetailCache::default()),
        }
    }

    /// Replace the reporter that observes fetch activity
    pub fn with_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn detail_url(&self, id: ShowId) -> Result<Url, CatalogError> {
        Ok(self.base_url.join(&format!("id/{}", id))?)
    }

    /// The last successfully fetched show list, if any
    pub fn cached_shows(&self) -> Option<Arc<Vec<Show>>> {
        lock(&self.shows).clone()
    }

    /// A completed detail for `id`, without touching the network
    pub fn cached_detail(&self, id: ShowId) -> Option<Arc<Show>> {
        match lock(&self.details).slots.get(&id) {
            Some(DetailSlot::Ready(show)) => Some(show.clone()),
            _ => None,
        }
    }

    /// True while a detail request for `id` is in flight
    pub fn is_detail_pending(&self, id: ShowId) -> bool {
        matches!(
            lock(&self.details).slots.get(&id),
            Some(DetailSlot::Pending { .. })
        )
    }

    /// Fetch the show list
    ///
    /// On success the list replaces the cached one. On failure the cached
    /// list is left untouched and remains available through
    /// [`cached_shows`](Self::cached_shows).
    pub async fn list_shows(&self) -> Result<Arc<Vec<Show>>, CatalogError> {
        let url = self.base_url.to_string();

        self.reporter
            .report(CatalogEvent::FetchingCatalog { url: url.clone() });

        match self.fetch_list(&url).await {
            Ok(shows) => {
                let shows = Arc::new(shows);
                *lock(&self.shows) = Some(shows.clone());

                tracing::info!(count = shows.len(), "catalog loaded");
                self.reporter.report(CatalogEvent::CatalogLoaded {
                    show_count: shows.len(),
                });
                Ok(shows)
            }
            Err(e) => {
                tracing::warn!(error = %e, "catalog unavailable, keeping cached list");
                self.reporter.report(CatalogEvent::FetchFailed {
                    show_id: None,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn fetch_list(&self, url: &str) -> Result<Vec<Show>, CatalogError> {
        let response = self
            .client
            .get(url)
            .await
            .map_err(|e| CatalogError::Network {
                url: url.to_string(),
                source: Arc::new(e),
            })?;

        if !response.is_success() {
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            });
        }

        parse_show_list(&response.body, url)
    }

    /// Fetch a show with its seasons and episodes
    ///
    /// Answered from the cache when the detail was fetched before. If a
    /// request for the same show is already in flight, this call waits for
    /// that request instead of issuing its own.
    pub async fn get_show_detail(&self, id: ShowId) -> DetailOutcome {
        let (request, future) = {
            let mut cache = lock(&self.details);

            match cache.slots.get(&id) {
                Some(DetailSlot::Ready(show)) => {
                    let show = show.clone();
                    drop(cache);
                    tracing::debug!(show_id = id, "detail served from cache");
                    self.reporter
                        .report(CatalogEvent::DetailCached { show_id: id });
                    return Ok(show);
                }
                Some(DetailSlot::Pending { request, future }) => {
                    let joined = (*request, future.clone());
                    drop(cache);
                    tracing::debug!(show_id = id, "joining in-flight detail request");
                    self.reporter
                        .report(CatalogEvent::DetailJoined { show_id: id });
                    joined
                }
                None => {
                    let url = self.detail_url(id)?;
                    let request = cache.next_request;
                    cache.next_request += 1;

                    let future = fetch_detail(self.client.clone(), url.clone(), id)
                        .boxed()
                        .shared();
                    cache.slots.insert(
                        id,
                        DetailSlot::Pending {
                            request,
                            future: future.clone(),
                        },
                    );
                    drop(cache);

                    self.reporter.report(CatalogEvent::FetchingDetail {
                        show_id: id,
                        url: url.to_string(),
                    });
                    (request, future)
                }
            }
        };

        let outcome = future.await;
        self.settle(id, request, &outcome);
        outcome
    }

    /// Move a finished request out of the pending state
    ///
    /// Every waiter calls this; only the first one for a given request finds
    /// it still pending, so events are reported once per request.
    fn settle(&self, id: ShowId, request: u64, outcome: &DetailOutcome) {
        let mut cache = lock(&self.details);

        let still_pending = matches!(
            cache.slots.get(&id),
            Some(DetailSlot::Pending { request: pending, .. }) if *pending == request
        );
        if !still_pending {
            return;
        }

        match outcome {
            Ok(show) => {
                cache.slots.insert(id, DetailSlot::Ready(show.clone()));
                drop(cache);

                let episode_count = show.all_episodes().count();
                tracing::info!(show_id = id, episodes = episode_count, "detail loaded");
                self.reporter.report(CatalogEvent::DetailLoaded {
                    show_id: id,
                    season_count: show.seasons().len(),
                    episode_count,
                });
            }
            Err(e) => {
                // Failures are not cached; the next call retries
                cache.slots.remove(&id);
                drop(cache);

                tracing::warn!(show_id = id, error = %e, "detail fetch failed");
                self.reporter.report(CatalogEvent::FetchFailed {
                    show_id: Some(id),
                    error: e.to_string(),
                });
            }
        }
    }
}

async fn fetch_detail<C: HttpClient>(client: Arc<C>, url: Url, id: ShowId) -> DetailOutcome {
    let response = client
        .get(url.as_str())
        .await
        .map_err(|e| CatalogError::Network {
            url: url.to_string(),
            source: Arc::new(e),
        })?;

    if response.status == 404 {
        return Err(CatalogError::NotFound(id));
    }

    if !response.is_success() {
        return Err(CatalogError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    parse_show_detail(&response.body, url.as_str(), id).map(Arc::new)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::events::testing::RecordingReporter;
    use crate::http::testing::MockHttpClient;

    const BASE: &str = "https://api.example.com/";
    const DETAIL_7: &str = "https://api.example.com/id/7";

    const LIST: &str = r#"[
        {"id": 7, "title": "Zeta", "genres": [1], "seasons": 2, "updated": "2023-01-01T00:00:00Z"},
        {"id": 8, "title": "Alpha", "genres": [3], "seasons": 1, "updated": "2022-01-01T00:00:00Z"}
    ]"#;

    const DETAIL: &str = r#"{
        "id": 7, "title": "Zeta", "genres": ["Personal Growth"],
        "seasons": [
            {"season": 1, "title": "One", "episodes": [{"title": "Pilot", "episode": 1}]},
            {"season": 2, "episodes": [{"title": "Return", "episode": 1}, {"title": "End", "episode": 2}]}
        ]
    }"#;

    fn fetcher(client: Arc<MockHttpClient>) -> CatalogFetcher<Arc<MockHttpClient>> {
        CatalogFetcher::new(client, Url::parse(BASE).unwrap())
    }

    #[test]
    fn detail_url_is_relative_to_base() {
        let client = Arc::new(MockHttpClient::new());
        let fetcher =
            CatalogFetcher::new(client, Url::parse("https://api.example.com/v1").unwrap());

        assert_eq!(fetcher.base_url().as_str(), "https://api.example.com/v1/");
        assert_eq!(
            fetcher.detail_url(42).unwrap().as_str(),
            "https://api.example.com/v1/id/42"
        );
    }

    #[tokio::test]
    async fn list_shows_caches_result() {
        let client = Arc::new(MockHttpClient::new().route(BASE, 200, LIST));
        let fetcher = fetcher(client.clone());

        assert!(fetcher.cached_shows().is_none());

        let shows = fetcher.list_shows().await.unwrap();
        assert_eq!(shows.len(), 2);
        assert!(shows.iter().all(|show| show.seasons.is_none()));
        assert_eq!(fetcher.cached_shows().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_list_keeps_previous_cache() {
        let client = Arc::new(MockHttpClient::new().route(BASE, 200, LIST));
        let fetcher = fetcher(client.clone());
        fetcher.list_shows().await.unwrap();

        client.set_route(BASE, 503, "Service Unavailable");
        let err = fetcher.list_shows().await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(fetcher.cached_shows().unwrap().len(), 2);

        client.set_route(BASE, 200, r#"{"not": "a list"}"#);
        let err = fetcher.list_shows().await.unwrap_err();
        assert!(err.is_decode());
        assert_eq!(fetcher.cached_shows().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn detail_is_fetched_once_and_cached() {
        let client = Arc::new(MockHttpClient::new().route(DETAIL_7, 200, DETAIL));
        let fetcher = fetcher(client.clone());

        let first = fetcher.get_show_detail(7).await.unwrap();
        let second = fetcher.get_show_detail(7).await.unwrap();

        assert_eq!(client.hits(DETAIL_7), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.seasons().len(), 2);
        assert!(fetcher.cached_detail(7).is_some());
    }

    #[tokio::test]
    async fn concurrent_detail_requests_are_coalesced() {
        let client = Arc::new(MockHttpClient::new().route(DETAIL_7, 200, DETAIL));
        let gate = client.gate(DETAIL_7);
        let reporter = Arc::new(RecordingReporter::default());
        let fetcher = fetcher(client.clone()).with_reporter(reporter.clone());

        let (a, b, ()) = tokio::join!(
            fetcher.get_show_detail(7),
            fetcher.get_show_detail(7),
            async {
                tokio::task::yield_now().await;
                assert!(fetcher.is_detail_pending(7));
                gate.add_permits(1);
            }
        );

        assert_eq!(client.hits(DETAIL_7), 1);
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert!(!fetcher.is_detail_pending(7));

        let events = reporter.events();
        assert!(events.contains(&CatalogEvent::DetailJoined { show_id: 7 }));
        let loaded = events
            .iter()
            .filter(|event| matches!(event, CatalogEvent::DetailLoaded { .. }))
            .count();
        assert_eq!(loaded, 1);
    }

    #[tokio::test]
    async fn missing_show_is_not_found() {
        let client = Arc::new(MockHttpClient::new());
        let fetcher = fetcher(client.clone());

        let err = fetcher.get_show_detail(99).await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(99)));
    }

    #[tokio::test]
    async fn failed_detail_is_retried_on_next_call() {
        let client = Arc::new(MockHttpClient::new().route(DETAIL_7, 500, "boom"));
        let fetcher = fetcher(client.clone());

        let err = fetcher.get_show_detail(7).await.unwrap_err();
        assert!(matches!(err, CatalogError::HttpStatus { status: 500, .. }));
        assert!(fetcher.cached_detail(7).is_none());

        client.set_route(DETAIL_7, 200, DETAIL);
        let show = fetcher.get_show_detail(7).await.unwrap();
        assert_eq!(show.id, 7);
        assert_eq!(client.hits(DETAIL_7), 2);
    }

    #[tokio::test]
    async fn coalesced_waiters_share_a_failure() {
        let client = Arc::new(MockHttpClient::new().route(DETAIL_7, 502, "bad gateway"));
        let gate = client.gate(DETAIL_7);
        let fetcher = fetcher(client.clone());

        let (a, b, ()) = tokio::join!(
            fetcher.get_show_detail(7),
            fetcher.get_show_detail(7),
            async {
                tokio::task::yield_now().await;
                gate.add_permits(1);
            }
        );

        assert!(a.unwrap_err().is_network());
        assert!(b.unwrap_err().is_network());
        assert_eq!(client.hits(DETAIL_7), 1);
    }
}
