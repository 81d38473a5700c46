mod storage;
mod store;

pub use storage::{
    EPISODE_FAVORITES_KEY, FAVORITES_KEY, FavoritesStorage, JsonFileStorage, MemoryStorage,
};
pub use store::FavoritesStore;
