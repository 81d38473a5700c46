// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::catalog::{Show, ShowId};

/// Ordering of the derived show list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    TitleAsc,
    TitleDesc,
    /// Most recently updated first
    UpdatedDesc,
    UpdatedAsc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortOrder::TitleAsc => "a-z",
            SortOrder::TitleDesc => "z-a",
            SortOrder::UpdatedDesc => "newest",
            SortOrder::UpdatedAsc => "oldest",
        };
        f.write_str(label)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a-z" | "title" | "title-asc" => Ok(SortOrder::TitleAsc),
            "z-a" | "title-desc" => Ok(SortOrder::TitleDesc),
            "newest" | "updated-desc" => Ok(SortOrder::UpdatedDesc),
            "oldest" | "updated-asc" => Ok(SortOrder::UpdatedAsc),
            other => Err(format!(
                "unknown sort order '{}' (expected a-z, z-a, newest or oldest)",
                other
            )),
        }
    }
}

/// User-controlled parameters of the show list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub search_text: String,
    pub sort_order: SortOrder,
    pub genre_filter: Option<u32>,
    pub favorites_only: bool,
    /// 1-based; clamped during pagination
    pub page: u32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            sort_order: SortOrder::default(),
            genre_filter: None,
            favorites_only: false,
            page: 1,
        }
    }
}

/// One page of a derived list
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page actually shown, after clamping
    pub page: u32,
    pub total_pages: u32,
    pub total_items: usize,
}

/// Filter and sort `shows` according to `view`
///
/// Stages run in a fixed order: search, genre, favorites-only, sort. The
/// result borrows from the input and only ever contains shows from it.
/// Sorting is stable, so ties keep the order the shows were fetched in.
pub fn derive_view<'a>(
    shows: &'a [Show],
    view: &ViewState,
    favorites: &BTreeSet<ShowId>,
) -> Vec<&'a Show> {
    let needle = view.search_text.to_lowercase();

    let mut visible: Vec<&Show> = shows
        .iter()
        .filter(|show| needle.is_empty() || show.title.to_lowercase().contains(&needle))
        .filter(|show| {
            view.genre_filter
                .is_none_or(|genre| show.genre_ids.contains(&genre))
        })
        .filter(|show| !view.favorites_only || favorites.contains(&show.id))
        .collect();

    match view.sort_order {
        SortOrder::TitleAsc => visible.sort_by_cached_key(|show| title_key(&show.title)),
        SortOrder::TitleDesc => visible.sort_by_cached_key(|show| Reverse(title_key(&show.title))),
        SortOrder::UpdatedAsc => visible.sort_by_key(|show| show.last_updated),
        SortOrder::UpdatedDesc => visible.sort_by_key(|show| Reverse(show.last_updated)),
    }

    visible
}

/// Filter, sort and cut out the page selected in `view`
pub fn derive_page<'a>(
    shows: &'a [Show],
    view: &ViewState,
    favorites: &BTreeSet<ShowId>,
    page_size: usize,
) -> Page<&'a Show> {
    paginate(derive_view(shows, view, favorites), view.page, page_size)
}

/// Cut `items` into pages of `page_size` and return page `page`
///
/// `page` is clamped to `1..=total_pages`; an empty list is one empty page.
pub fn paginate<T>(items: Vec<T>, page: u32, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1) as u32;
    let page = page.clamp(1, total_pages);

    let start = (page as usize - 1) * page_size;
    let items = items.into_iter().skip(start).take(page_size).collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

/// Collation key approximating locale-aware title comparison
///
/// Accents and case are ignored first; the raw title breaks ties so the
/// ordering stays total.
fn title_key(title: &str) -> (String, String) {
    let folded = title
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    (folded, title.to_string())
}
