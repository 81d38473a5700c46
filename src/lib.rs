pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod favorites;
pub mod genre;
pub mod http;
pub mod selection;
pub mod session;
pub mod view;

// Re-export main types for convenience
pub use catalog::{CatalogFetcher, Episode, EpisodeKey, Season, Show, ShowId};
pub use config::ClientConfig;
pub use error::{CatalogError, PersistenceError};
pub use events::{CatalogEvent, CatalogReporter, NoopReporter, SharedReporter};
pub use favorites::{FavoritesStorage, FavoritesStore, JsonFileStorage, MemoryStorage};
pub use genre::{Genre, UNKNOWN_GENRE, genre_name};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use selection::{DetailState, DetailTicket, Phase, Selection, SelectionState};
pub use session::Session;
pub use view::{Page, SortOrder, ViewState, derive_page, derive_view, paginate};
