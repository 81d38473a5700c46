// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::catalog::{DetailOutcome, Episode, EpisodeKey, Season, Show, ShowId};
use crate::error::CatalogError;

/// Which show, season and episode are open
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub open_show_id: Option<ShowId>,
    pub active_season_number: Option<u32>,
    /// Episode whose detail is visible
    pub active_episode: Option<EpisodeKey>,
}

/// Coarse state of the selection machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Closed,
    Open(ShowId),
    SeasonSelected(ShowId, u32),
}

/// Detail data for the open show
#[derive(Debug, Clone)]
pub enum DetailState {
    /// No show is open
    Idle,
    /// The detail fetch has not completed yet
    Loading,
    Loaded(Arc<Show>),
    /// The API has no record of the show; rendered as a show without seasons
    NotFound,
    /// The detail fetch failed; only the open show is affected
    Failed(CatalogError),
}

/// Proof that a detail fetch was started for a particular selection
///
/// Outcomes are applied through the ticket so that responses for a show
/// that is no longer open can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the detail outcome must be applied with the ticket"]
pub struct DetailTicket {
    show_id: ShowId,
}

impl DetailTicket {
    pub fn show_id(&self) -> ShowId {
        self.show_id
    }
}

/// Selection state machine: `Closed` → `Open` → `SeasonSelected` and back
#[derive(Debug, Clone)]
pub struct Selection {
    state: SelectionState,
    detail: DetailState,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    pub fn new() -> Self {
        Self {
            state: SelectionState::default(),
            detail: DetailState::Idle,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn detail(&self) -> &DetailState {
        &self.detail
    }

    pub fn phase(&self) -> Phase {
        match (self.state.open_show_id, self.state.active_season_number) {
            (None, _) => Phase::Closed,
            (Some(id), None) => Phase::Open(id),
            (Some(id), Some(season)) => Phase::SeasonSelected(id, season),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.open_show_id.is_some()
    }

    /// True while the open show's seasons are still being fetched
    pub fn is_loading_seasons(&self) -> bool {
        matches!(self.detail, DetailState::Loading)
    }

    /// Open `id`, replacing whatever was open before
    ///
    /// The season list stays empty until the returned ticket is used to
    /// apply the detail outcome.
    pub fn select_show(&mut self, id: ShowId) -> DetailTicket {
        let same_show_loaded = self.state.open_show_id == Some(id)
            && matches!(self.detail, DetailState::Loaded(_));

        self.state = SelectionState {
            open_show_id: Some(id),
            active_season_number: None,
            active_episode: None,
        };
        if !same_show_loaded {
            self.detail = DetailState::Loading;
        }

        DetailTicket { show_id: id }
    }

    /// Apply a finished detail fetch
    ///
    /// Returns `false` and leaves the state untouched when the ticket's show
    /// is no longer the open one.
    pub fn apply_detail(&mut self, ticket: DetailTicket, outcome: DetailOutcome) -> bool {
        if self.state.open_show_id != Some(ticket.show_id) {
            tracing::debug!(
                show_id = ticket.show_id,
                open = ?self.state.open_show_id,
                "discarding stale detail response"
            );
            return false;
        }

        self.detail = match outcome {
            Ok(show) => DetailState::Loaded(show),
            Err(CatalogError::NotFound(_)) => DetailState::NotFound,
            Err(e) => DetailState::Failed(e),
        };
        true
    }

    /// Pick a season, or go back to the whole show with `None`
    ///
    /// Ignored while no show is open.
    pub fn select_season(&mut self, number: Option<u32>) -> bool {
        if !self.is_open() {
            return false;
        }

        if self.state.active_season_number != number {
            self.state.active_episode = None;
        }
        self.state.active_season_number = number;
        true
    }

    /// Show the detail of one episode, or hide it with `None`
    pub fn select_episode(&mut self, key: Option<EpisodeKey>) -> bool {
        if !self.is_open() {
            return false;
        }

        self.state.active_episode = key;
        true
    }

    /// Close the open show; returns `false` if nothing was open
    pub fn close(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }

        self.state = SelectionState::default();
        self.detail = DetailState::Idle;
        true
    }

    /// The open show's detail, once loaded
    pub fn show(&self) -> Option<&Arc<Show>> {
        match &self.detail {
            DetailState::Loaded(show) => Some(show),
            _ => None,
        }
    }

    /// Seasons of the open show; empty while loading, missing or failed
    pub fn seasons(&self) -> &[Season] {
        self.show().map(|show| show.seasons()).unwrap_or(&[])
    }

    /// Episodes of the active season, or of every season when none is active
    pub fn visible_episodes(&self) -> Vec<&Episode> {
        let Some(show) = self.show() else {
            return Vec::new();
        };

        match self.state.active_season_number {
            Some(number) => show.episodes_in(number).iter().collect(),
            None => show.all_episodes().collect(),
        }
    }

    /// The episode whose detail is visible, if it is among the visible episodes
    pub fn active_episode(&self) -> Option<&Episode> {
        let key = self.state.active_episode.as_ref()?;
        self.visible_episodes()
            .into_iter()
            .find(|episode| &episode.key() == key)
    }
}
