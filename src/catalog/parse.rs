// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::CatalogError;
use crate::genre;

use super::model::{Episode, Season, Show, ShowId, parse_timestamp};

/// Integers the API sends either as JSON numbers or as numeric strings
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Number {
    Int(u64),
    Text(String),
}

impl Number {
    fn as_u32(&self) -> Option<u32> {
        match self {
            Number::Int(n) => u32::try_from(*n).ok(),
            Number::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Genres arrive as IDs in the list payload and as names in the detail payload
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawGenre {
    Id(u64),
    Name(String),
}

impl RawGenre {
    fn resolve(&self) -> Option<u32> {
        match self {
            RawGenre::Id(id) => u32::try_from(*id).ok(),
            RawGenre::Name(name) => name
                .trim()
                .parse()
                .ok()
                .or_else(|| genre::genre_by_name(name).map(|g| g.id)),
        }
    }
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The list payload carries a season count, the detail payload the seasons
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSeasons {
    Count(u32),
    List(Vec<RawSeason>),
}

#[derive(Debug, Deserialize)]
struct RawShow {
    id: Number,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    image: String,
    #[serde(default, alias = "genreIds", deserialize_with = "null_as_default")]
    genres: Vec<RawGenre>,
    #[serde(default, alias = "lastUpdated")]
    updated: Option<String>,
    #[serde(default)]
    seasons: Option<RawSeasons>,
}

#[derive(Debug, Deserialize)]
struct RawSeason {
    #[serde(default, alias = "number")]
    season: Option<Number>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    episodes: Vec<RawEpisode>,
}

#[derive(Debug, Deserialize)]
struct RawEpisode {
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, alias = "episodeNumber")]
    episode: Option<Number>,
    #[serde(default, alias = "audioUrl")]
    file: Option<String>,
}

/// Decode the list endpoint payload into show summaries
///
/// Entries that cannot be decoded are skipped; a payload that is not an
/// array at all is an error. Summaries never carry seasons.
pub fn parse_show_list(body: &[u8], url: &str) -> Result<Vec<Show>, CatalogError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| CatalogError::Decode {
        url: url.to_string(),
        source: Arc::new(e),
    })?;

    let Value::Array(entries) = value else {
        return Err(CatalogError::NotAList {
            url: url.to_string(),
        });
    };

    let shows = entries
        .into_iter()
        .filter_map(|entry| match RawShow::deserialize(entry) {
            Ok(raw) => convert_summary(raw),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed show entry");
                None
            }
        })
        .collect();

    Ok(shows)
}

/// Decode the detail endpoint payload for `id`
///
/// A `null` body or an empty object means the API has no such show.
pub fn parse_show_detail(body: &[u8], url: &str, id: ShowId) -> Result<Show, CatalogError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| CatalogError::Decode {
        url: url.to_string(),
        source: Arc::new(e),
    })?;

    match &value {
        Value::Null => return Err(CatalogError::NotFound(id)),
        Value::Object(map) if map.is_empty() => return Err(CatalogError::NotFound(id)),
        _ => {}
    }

    let raw = RawShow::deserialize(value).map_err(|e| CatalogError::Decode {
        url: url.to_string(),
        source: Arc::new(e),
    })?;

    let mut show = convert_base(&raw, id);

    // A detail response without a season list still completes the detail
    let seasons = match raw.seasons {
        Some(RawSeasons::List(list)) => convert_seasons(list),
        _ => Vec::new(),
    };
    show.season_count = Some(seasons.len() as u32);
    show.seasons = Some(seasons);

    Ok(show)
}

fn convert_summary(raw: RawShow) -> Option<Show> {
    let Some(id) = raw.id.as_u32() else {
        tracing::warn!(title = %raw.title, "skipping show with invalid id");
        return None;
    };

    let mut show = convert_base(&raw, id);
    show.season_count = match &raw.seasons {
        Some(RawSeasons::Count(count)) => Some(*count),
        Some(RawSeasons::List(list)) => Some(list.len() as u32),
        None => None,
    };
    Some(show)
}

fn convert_base(raw: &RawShow, id: ShowId) -> Show {
    let genre_ids: BTreeSet<u32> = raw.genres.iter().filter_map(RawGenre::resolve).collect();

    Show {
        id,
        title: raw.title.clone(),
        description: raw.description.clone(),
        image: raw.image.clone(),
        genre_ids,
        last_updated: raw.updated.as_deref().and_then(parse_timestamp),
        season_count: None,
        seasons: None,
    }
}

fn convert_seasons(list: Vec<RawSeason>) -> Vec<Season> {
    list.into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let number = raw
                .season
                .as_ref()
                .and_then(Number::as_u32)
                .unwrap_or(index as u32 + 1);

            let episodes = raw
                .episodes
                .into_iter()
                .map(|episode| Episode {
                    season_number: number,
                    episode_number: episode.episode.as_ref().and_then(Number::as_u32).unwrap_or(0),
                    title: episode.title,
                    description: episode.description.filter(|s| !s.is_empty()),
                    audio_url: episode.file.filter(|s| !s.is_empty()),
                })
                .collect();

            Season {
                number,
                title: raw.title.filter(|s| !s.is_empty()),
                image: raw.image.filter(|s| !s.is_empty()),
                episodes,
            }
        })
        .collect()
}
