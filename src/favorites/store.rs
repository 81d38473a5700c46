// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeSet;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::catalog::{EpisodeKey, ShowId};
use crate::error::PersistenceError;

use super::storage::{EPISODE_FAVORITES_KEY, FAVORITES_KEY, FavoritesStorage};

/// Favorited shows and episodes, written through to durable storage
///
/// The store is the only writer of the persisted favorites. Every mutation
/// updates memory first and then persists the affected set before
/// returning. When persisting fails the in-memory change is kept and the
/// error is returned; the next successful write (or [`flush`](Self::flush))
/// brings storage back in line.
pub struct FavoritesStore<S> {
    storage: S,
    shows: BTreeSet<ShowId>,
    episodes: BTreeSet<EpisodeKey>,
}

impl<S: FavoritesStorage> FavoritesStore<S> {
    /// Load both favorite sets from `storage`
    ///
    /// Missing keys are empty sets. A value that does not decode is logged
    /// and treated as empty.
    pub fn load(storage: S) -> Result<Self, PersistenceError> {
        let shows = read_set(&storage, FAVORITES_KEY)?;
        let episodes = read_set(&storage, EPISODE_FAVORITES_KEY)?;

        tracing::debug!(
            shows = shows.len(),
            episodes = episodes.len(),
            "favorites loaded"
        );

        Ok(Self {
            storage,
            shows,
            episodes,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_show_favorite(&self, id: ShowId) -> bool {
        self.shows.contains(&id)
    }

    pub fn is_episode_favorite(&self, key: &EpisodeKey) -> bool {
        self.episodes.contains(key)
    }

    pub fn show_ids(&self) -> &BTreeSet<ShowId> {
        &self.shows
    }

    pub fn episode_keys(&self) -> &BTreeSet<EpisodeKey> {
        &self.episodes
    }

    /// Flip a show's membership and return the new state
    pub fn toggle_show_favorite(&mut self, id: ShowId) -> Result<bool, PersistenceError> {
        let favorited = toggle(&mut self.shows, id);
        tracing::debug!(show_id = id, favorited, "show favorite toggled");

        write_set(&self.storage, FAVORITES_KEY, &self.shows)?;
        Ok(favorited)
    }

    /// Flip an episode's membership and return the new state
    pub fn toggle_episode_favorite(&mut self, key: &EpisodeKey) -> Result<bool, PersistenceError> {
        let favorited = toggle(&mut self.episodes, key.clone());
        tracing::debug!(episode = %key, favorited, "episode favorite toggled");

        write_set(&self.storage, EPISODE_FAVORITES_KEY, &self.episodes)?;
        Ok(favorited)
    }

    /// Forget every favorited episode
    pub fn clear_episode_favorites(&mut self) -> Result<(), PersistenceError> {
        self.episodes.clear();
        self.storage.remove(EPISODE_FAVORITES_KEY)
    }

    /// Forget every favorited show and episode
    pub fn reset_all(&mut self) -> Result<(), PersistenceError> {
        self.shows.clear();
        self.episodes.clear();

        // Attempt both removals even if the first one fails
        let shows = self.storage.remove(FAVORITES_KEY);
        let episodes = self.storage.remove(EPISODE_FAVORITES_KEY);
        shows.and(episodes)
    }

    /// Persist both sets as they are in memory
    pub fn flush(&self) -> Result<(), PersistenceError> {
        write_set(&self.storage, FAVORITES_KEY, &self.shows)?;
        write_set(&self.storage, EPISODE_FAVORITES_KEY, &self.episodes)
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) -> bool {
    if set.remove(&value) {
        false
    } else {
        set.insert(value);
        true
    }
}

fn read_set<S, T>(storage: &S, key: &str) -> Result<BTreeSet<T>, PersistenceError>
where
    S: FavoritesStorage,
    T: DeserializeOwned + Ord,
{
    let Some(raw) = storage.load(key)? else {
        return Ok(BTreeSet::new());
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(values) => Ok(values.into_iter().collect()),
        Err(e) => {
            let error = PersistenceError::Corrupt {
                key: key.to_string(),
                source: e,
            };
            tracing::warn!(%error, "ignoring stored favorites");
            Ok(BTreeSet::new())
        }
    }
}

fn write_set<S, T>(storage: &S, key: &str, set: &BTreeSet<T>) -> Result<(), PersistenceError>
where
    S: FavoritesStorage,
    T: Serialize,
{
    let json = serde_json::to_string(set)?;
    storage.save(key, &json).inspect_err(|e| {
        tracing::warn!(key, error = %e, "failed to persist favorites");
    })
}
