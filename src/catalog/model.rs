// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a show, stable across fetches
pub type ShowId = u32;

/// A podcast show as listed by the catalog API
#[derive(Debug, Clone, PartialEq)]
pub struct Show {
    pub id: ShowId,
    pub title: String,
    pub description: String,
    pub image: String,
    pub genre_ids: BTreeSet<u32>,
    /// `None` when the API sent no timestamp or one we could not parse
    pub last_updated: Option<DateTime<Utc>>,
    /// Number of seasons advertised by the list endpoint
    pub season_count: Option<u32>,
    /// `None` until a detail fetch for this show has completed
    pub seasons: Option<Vec<Season>>,
}

impl Show {
    /// True once the seasons have been populated by a detail fetch
    pub fn has_detail(&self) -> bool {
        self.seasons.is_some()
    }

    /// Seasons of the show, empty while the detail is not loaded
    pub fn seasons(&self) -> &[Season] {
        self.seasons.as_deref().unwrap_or(&[])
    }

    pub fn season(&self, number: u32) -> Option<&Season> {
        self.seasons().iter().find(|season| season.number == number)
    }

    /// Episodes of a single season; an absent season has no episodes
    pub fn episodes_in(&self, number: u32) -> &[Episode] {
        self.season(number)
            .map(|season| season.episodes.as_slice())
            .unwrap_or(&[])
    }

    /// Episodes in `season` numbered `episode`, narrowed to `title` when given
    ///
    /// Malformed data can repeat an episode number within a season; the
    /// title is what tells those apart.
    pub fn find_episodes(&self, season: u32, episode: u32, title: Option<&str>) -> Vec<&Episode> {
        self.episodes_in(season)
            .iter()
            .filter(|e| e.episode_number == episode)
            .filter(|e| title.is_none_or(|title| e.title == title))
            .collect()
    }

    /// All episodes across all seasons, in season order
    pub fn all_episodes(&self) -> impl Iterator<Item = &Episode> {
        self.seasons().iter().flat_map(|season| season.episodes.iter())
    }
}

/// A season within a show
#[derive(Debug, Clone, PartialEq)]
pub struct Season {
    /// 1-based, unique within a show, not necessarily contiguous
    pub number: u32,
    pub title: Option<String>,
    pub image: Option<String>,
    pub episodes: Vec<Episode>,
}

impl Season {
    /// Label used in season pickers: "Season 2" or "Season 2 - Title"
    pub fn label(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => format!("Season {} - {}", self.number, title),
            _ => format!("Season {}", self.number),
        }
    }
}

/// A single episode
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub season_number: u32,
    pub episode_number: u32,
    pub title: String,
    pub description: Option<String>,
    pub audio_url: Option<String>,
}

impl Episode {
    pub fn key(&self) -> EpisodeKey {
        EpisodeKey::new(self.season_number, self.episode_number, &self.title)
    }
}

/// Identity of an episode: `"{season}-{episode}-{title}"`
///
/// The title is part of the key because season and episode numbers alone
/// collide in malformed feeds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeKey(String);

impl EpisodeKey {
    pub fn new(season: u32, episode: u32, title: &str) -> Self {
        Self(format!("{}-{}-{}", season, episode, title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EpisodeKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for EpisodeKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// Parse a catalog timestamp, accepting RFC 3339 and a few looser forms
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S %z"];
    for format in formats {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(season: u32, number: u32, title: &str) -> Episode {
        Episode {
            season_number: season,
            episode_number: number,
            title: title.to_string(),
            description: None,
            audio_url: None,
        }
    }

    fn show_with_seasons(seasons: Option<Vec<Season>>) -> Show {
        Show {
            id: 1,
            title: "Show".to_string(),
            description: String::new(),
            image: String::new(),
            genre_ids: BTreeSet::new(),
            last_updated: None,
            season_count: None,
            seasons,
        }
    }

    #[test]
    fn episode_key_includes_title() {
        let key = episode(2, 5, "Pilot").key();
        assert_eq!(key.as_str(), "2-5-Pilot");
        assert_eq!(key, EpisodeKey::from("2-5-Pilot"));
        assert_ne!(key, episode(2, 5, "Pilot (Rerun)").key());
    }

    #[test]
    fn episode_key_serializes_as_plain_string() {
        let json = serde_json::to_string(&EpisodeKey::new(1, 3, "Hello")).unwrap();
        assert_eq!(json, r#""1-3-Hello""#);
    }

    #[test]
    fn show_without_detail_has_no_seasons() {
        let show = show_with_seasons(None);
        assert!(!show.has_detail());
        assert!(show.seasons().is_empty());
        assert!(show.episodes_in(1).is_empty());
    }

    #[test]
    fn absent_season_yields_empty_episodes() {
        let show = show_with_seasons(Some(vec![Season {
            number: 1,
            title: None,
            image: None,
            episodes: vec![episode(1, 1, "One"), episode(1, 2, "Two")],
        }]));

        assert_eq!(show.episodes_in(1).len(), 2);
        assert!(show.episodes_in(4).is_empty());
        assert_eq!(show.all_episodes().count(), 2);
    }

    #[test]
    fn duplicate_episode_numbers_are_told_apart_by_title() {
        let show = show_with_seasons(Some(vec![Season {
            number: 2,
            title: None,
            image: None,
            episodes: vec![
                episode(2, 5, "Pilot"),
                episode(2, 5, "Pilot (Rerun)"),
                episode(2, 6, "Finale"),
            ],
        }]));

        assert_eq!(show.find_episodes(2, 5, None).len(), 2);

        let rerun = show.find_episodes(2, 5, Some("Pilot (Rerun)"));
        assert_eq!(rerun.len(), 1);
        assert_eq!(rerun[0].key().as_str(), "2-5-Pilot (Rerun)");

        assert!(show.find_episodes(2, 5, Some("Finale")).is_empty());
        assert!(show.find_episodes(3, 5, None).is_empty());
    }

    #[test]
    fn season_label_includes_title_when_present() {
        let mut season = Season {
            number: 3,
            title: None,
            image: None,
            episodes: vec![],
        };
        assert_eq!(season.label(), "Season 3");

        season.title = Some("The Return".to_string());
        assert_eq!(season.label(), "Season 3 - The Return");
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        let dt = parse_timestamp("2022-11-03T07:00:00.000Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2022-11-03T07:00:00+00:00");
    }

    #[test]
    fn parses_date_only_timestamps() {
        let dt = parse_timestamp("2021-05-01").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2021-05-01 00:00");
    }

    #[test]
    fn rejects_garbage_timestamps() {
        assert!(parse_timestamp("last tuesday").is_none());
        assert!(parse_timestamp("").is_none());
    }
}
