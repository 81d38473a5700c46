// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::catalog::{CatalogFetcher, DetailOutcome, EpisodeKey, Show, ShowId};
use crate::config::ClientConfig;
use crate::error::{CatalogError, PersistenceError};
use crate::events::SharedReporter;
use crate::favorites::{FavoritesStorage, FavoritesStore, JsonFileStorage};
use crate::http::HttpClient;
use crate::selection::{DetailState, DetailTicket, Selection};
use crate::view::{Page, SortOrder, ViewState, derive_page, derive_view};

/// Everything a front end reads from and acts on
///
/// Owns the catalog fetcher, the favorites store, the current view state and
/// the selection machine. Derived lists are recomputed on every read.
///
/// The fetcher is shared, so detail requests started through
/// [`detail_request`](Self::detail_request) keep running while the session
/// goes on handling input.
pub struct Session<C, S> {
    fetcher: Arc<CatalogFetcher<C>>,
    favorites: FavoritesStore<S>,
    shows: Arc<Vec<Show>>,
    catalog_unavailable: bool,
    view: ViewState,
    selection: Selection,
    page_size: usize,
}

impl<C: HttpClient + 'static> Session<C, JsonFileStorage> {
    /// Build a session from configuration, persisting favorites under
    /// `config.data_dir`
    pub fn open(
        client: C,
        config: &ClientConfig,
        reporter: SharedReporter,
    ) -> Result<Self, PersistenceError> {
        let fetcher = CatalogFetcher::new(client, config.base_url.clone()).with_reporter(reporter);
        let favorites = FavoritesStore::load(JsonFileStorage::new(&config.data_dir))?;
        Ok(Self::new(fetcher, favorites, config.page_size))
    }
}

impl<C: HttpClient + 'static, S: FavoritesStorage> Session<C, S> {
    pub fn new(fetcher: CatalogFetcher<C>, favorites: FavoritesStore<S>, page_size: usize) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            favorites,
            shows: Arc::new(Vec::new()),
            catalog_unavailable: false,
            view: ViewState::default(),
            selection: Selection::new(),
            page_size: page_size.max(1),
        }
    }

    pub fn fetcher(&self) -> &CatalogFetcher<C> {
        &self.fetcher
    }

    pub fn favorites(&self) -> &FavoritesStore<S> {
        &self.favorites
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The raw catalog, in fetch order
    pub fn shows(&self) -> &[Show] {
        &self.shows
    }

    /// True when the last catalog refresh failed; the previous list is still shown
    pub fn is_catalog_unavailable(&self) -> bool {
        self.catalog_unavailable
    }

    /// Fetch the catalog, keeping the current list if the fetch fails
    pub async fn refresh_catalog(&mut self) -> Result<usize, CatalogError> {
        match self.fetcher.list_shows().await {
            Ok(shows) => {
                self.shows = shows;
                self.catalog_unavailable = false;
                Ok(self.shows.len())
            }
            Err(e) => {
                self.catalog_unavailable = true;
                Err(e)
            }
        }
    }

    pub fn visible_shows(&self) -> Vec<&Show> {
        derive_view(&self.shows, &self.view, self.favorites.show_ids())
    }

    pub fn visible_page(&self) -> Page<&Show> {
        derive_page(
            &self.shows,
            &self.view,
            self.favorites.show_ids(),
            self.page_size,
        )
    }

    pub fn set_search(&mut self, text: impl Into<String>) {
        self.view.search_text = text.into();
        self.view.page = 1;
    }

    pub fn set_sort(&mut self, sort_order: SortOrder) {
        self.view.sort_order = sort_order;
        self.view.page = 1;
    }

    pub fn set_genre(&mut self, genre: Option<u32>) {
        self.view.genre_filter = genre;
        self.view.page = 1;
    }

    pub fn set_favorites_only(&mut self, favorites_only: bool) {
        self.view.favorites_only = favorites_only;
        self.view.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.view.page = page;
    }

    /// Open a show without waiting for its detail
    ///
    /// A cached detail is applied immediately. Otherwise the caller fetches
    /// the detail and hands the outcome to [`apply_detail`](Self::apply_detail).
    pub fn select_show(&mut self, id: ShowId) -> DetailTicket {
        let ticket = self.selection.select_show(id);
        if let Some(show) = self.fetcher.cached_detail(id) {
            self.selection.apply_detail(ticket, Ok(show));
        }
        ticket
    }

    /// Start fetching the detail of `id` without borrowing the session
    ///
    /// Pair with the ticket from [`select_show`](Self::select_show) and hand
    /// the outcome to [`apply_detail`](Self::apply_detail). An outcome for a
    /// show that is no longer open is discarded there.
    pub fn detail_request(&self, id: ShowId) -> BoxFuture<'static, DetailOutcome> {
        let fetcher = self.fetcher.clone();
        async move { fetcher.get_show_detail(id).await }.boxed()
    }

    pub fn apply_detail(&mut self, ticket: DetailTicket, outcome: DetailOutcome) -> bool {
        self.selection.apply_detail(ticket, outcome)
    }

    /// Open a show and wait for its seasons
    pub async fn open_show(&mut self, id: ShowId) -> &DetailState {
        let ticket = self.select_show(id);
        if self.selection.is_loading_seasons() {
            let outcome = self.fetcher.get_show_detail(id).await;
            self.selection.apply_detail(ticket, outcome);
        }
        self.selection.detail()
    }

    pub fn select_season(&mut self, number: Option<u32>) -> bool {
        self.selection.select_season(number)
    }

    pub fn select_episode(&mut self, key: Option<EpisodeKey>) -> bool {
        self.selection.select_episode(key)
    }

    pub fn close(&mut self) -> bool {
        self.selection.close()
    }

    pub fn is_show_favorite(&self, id: ShowId) -> bool {
        self.favorites.is_show_favorite(id)
    }

    pub fn is_episode_favorite(&self, key: &EpisodeKey) -> bool {
        self.favorites.is_episode_favorite(key)
    }

    pub fn toggle_show_favorite(&mut self, id: ShowId) -> Result<bool, PersistenceError> {
        self.favorites.toggle_show_favorite(id)
    }

    pub fn toggle_episode_favorite(&mut self, key: &EpisodeKey) -> Result<bool, PersistenceError> {
        self.favorites.toggle_episode_favorite(key)
    }

    pub fn clear_episode_favorites(&mut self) -> Result<(), PersistenceError> {
        self.favorites.clear_episode_favorites()
    }

    pub fn reset_all(&mut self) -> Result<(), PersistenceError> {
        self.favorites.reset_all()
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::favorites::{FAVORITES_KEY, MemoryStorage};
    use crate::http::testing::MockHttpClient;
    use crate::selection::Phase;
    use tempfile::tempdir;

    const BASE: &str = "https://api.example.com/";
    const DETAIL_1: &str = "https://api.example.com/id/1";

    const LIST: &str = r#"[
        {"id": 1, "title": "Zeta", "genres": [1], "updated": "2023-01-01T00:00:00Z"},
        {"id": 2, "title": "Alpha", "genres": [4], "updated": "2021-01-01T00:00:00Z"},
        {"id": 3, "title": "Mika", "genres": [4], "updated": "2022-01-01T00:00:00Z"}
    ]"#;

    type TestSession = Session<Arc<MockHttpClient>, Arc<MemoryStorage>>;

    fn session() -> (Arc<MockHttpClient>, Arc<MemoryStorage>, TestSession) {
        let client = Arc::new(
            MockHttpClient::new()
                .route(BASE, 200, LIST)
                .route(
                    "https://api.example.com/id/2",
                    200,
                    r#"{"id": 2, "title": "Alpha", "seasons": [
                        {"season": 1, "episodes": [{"title": "Start", "episode": 1}]},
                        {"season": 2, "episodes": [{"title": "Middle", "episode": 1}]},
                        {"season": 3, "episodes": [{"title": "End", "episode": 1}]}
                    ]}"#,
                )
                .route(
                    DETAIL_1,
                    200,
                    r#"{"id": 1, "title": "Zeta", "seasons": [
                        {"season": 1, "episodes": [{"title": "Pilot", "episode": 1}]},
                        {"season": 2, "episodes": [{"title": "Return", "episode": 1}]}
                    ]}"#,
                ),
        );
        let storage = Arc::new(MemoryStorage::new());
        let fetcher = CatalogFetcher::new(client.clone(), Url::parse(BASE).unwrap());
        let favorites = FavoritesStore::load(storage.clone()).unwrap();
        (client, storage, Session::new(fetcher, favorites, 2))
    }

    fn titles(shows: &[&Show]) -> Vec<String> {
        shows.iter().map(|show| show.title.clone()).collect()
    }

    #[tokio::test]
    async fn refresh_populates_sorted_view() {
        let (_, _, mut session) = session();

        assert_eq!(session.refresh_catalog().await.unwrap(), 3);

        assert_eq!(titles(&session.visible_shows()), vec!["Alpha", "Mika", "Zeta"]);
        assert!(!session.is_catalog_unavailable());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_list_and_flags_unavailable() {
        let (client, _, mut session) = session();
        session.refresh_catalog().await.unwrap();

        client.set_route(BASE, 500, "oops");
        assert!(session.refresh_catalog().await.is_err());

        assert!(session.is_catalog_unavailable());
        assert_eq!(session.shows().len(), 3);

        client.set_route(BASE, 200, LIST);
        session.refresh_catalog().await.unwrap();
        assert!(!session.is_catalog_unavailable());
    }

    #[tokio::test]
    async fn filters_reset_page() {
        let (_, _, mut session) = session();
        session.refresh_catalog().await.unwrap();

        session.set_page(2);
        assert_eq!(session.visible_page().page, 2);
        assert_eq!(titles(&session.visible_page().items), vec!["Zeta"]);

        session.set_genre(Some(4));
        assert_eq!(session.view().page, 1);
        assert_eq!(titles(&session.visible_page().items), vec!["Alpha", "Mika"]);
        assert_eq!(session.visible_page().total_pages, 1);
    }

    #[tokio::test]
    async fn favorites_only_follows_toggles() {
        let (_, storage, mut session) = session();
        session.refresh_catalog().await.unwrap();
        session.set_favorites_only(true);

        assert!(session.visible_shows().is_empty());

        assert!(session.toggle_show_favorite(3).unwrap());
        assert_eq!(titles(&session.visible_shows()), vec!["Mika"]);
        assert_eq!(storage.get(FAVORITES_KEY).as_deref(), Some("[3]"));

        assert!(!session.toggle_show_favorite(3).unwrap());
        assert!(session.visible_shows().is_empty());
    }

    #[tokio::test]
    async fn open_show_loads_seasons_once() {
        let (client, _, mut session) = session();

        assert!(matches!(session.open_show(1).await, DetailState::Loaded(_)));
        assert_eq!(session.selection().seasons().len(), 2);

        session.select_season(Some(2));
        assert_eq!(session.selection().phase(), Phase::SeasonSelected(1, 2));

        session.close();
        let _ = session.select_show(1);

        assert!(!session.selection().is_loading_seasons());
        assert_eq!(client.hits(DETAIL_1), 1);
    }

    #[tokio::test]
    async fn late_detail_for_previous_show_is_discarded() {
        let (client, _, mut session) = session();
        let gate = client.gate(DETAIL_1);

        let ticket_a = session.select_show(1);
        let pending_a = tokio::spawn(session.detail_request(1));

        let ticket_b = session.select_show(2);
        let outcome_b = session.detail_request(2).await;
        assert!(session.apply_detail(ticket_b, outcome_b));

        gate.add_permits(1);
        let outcome_a = pending_a.await.unwrap();
        assert!(outcome_a.is_ok());
        assert!(!session.apply_detail(ticket_a, outcome_a));

        assert_eq!(session.selection().phase(), Phase::Open(2));
        assert_eq!(session.selection().show().unwrap().id, 2);
        assert_eq!(session.selection().seasons().len(), 3);
        assert!(session.fetcher().cached_detail(1).is_some());
    }

    #[tokio::test]
    async fn missing_show_opens_with_empty_seasons() {
        let (_, _, mut session) = session();

        assert!(matches!(session.open_show(99).await, DetailState::NotFound));
        assert!(session.selection().seasons().is_empty());
        assert!(session.close());
        assert!(!session.close());
    }

    #[tokio::test]
    async fn episode_favorites_scenario() {
        let (_, storage, mut session) = session();
        let pilot = EpisodeKey::from("2-5-Pilot");

        session.toggle_episode_favorite(&pilot).unwrap();
        assert!(session.is_episode_favorite(&pilot));

        session.clear_episode_favorites().unwrap();

        assert!(!session.is_episode_favorite(&pilot));
        assert!(
            storage
                .get(crate::favorites::EPISODE_FAVORITES_KEY)
                .is_none_or(|raw| raw == "[]")
        );
    }

    #[test]
    fn open_uses_data_dir_for_favorites() {
        let dir = tempdir().unwrap();
        let config = ClientConfig::default()
            .with_base_url(Url::parse(BASE).unwrap())
            .with_data_dir(dir.path());

        let mut session = Session::open(
            MockHttpClient::new(),
            &config,
            crate::events::NoopReporter::shared(),
        )
        .unwrap();
        session.toggle_show_favorite(10716).unwrap();

        assert!(dir.path().join("favorites.json").exists());
        assert!(session.is_show_favorite(10716));
    }
}
