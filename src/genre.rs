// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Name reported for genre IDs outside the table
pub const UNKNOWN_GENRE: &str = "Unknown Genre";

/// A podcast genre as published by the catalog API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Genre {
    pub id: u32,
    pub name: &'static str,
}

const GENRES: [Genre; 9] = [
    Genre { id: 1, name: "Personal Growth" },
    Genre { id: 2, name: "Investigative Journalism" },
    Genre { id: 3, name: "History" },
    Genre { id: 4, name: "Comedy" },
    Genre { id: 5, name: "Entertainment" },
    Genre { id: 6, name: "Business" },
    Genre { id: 7, name: "Fiction" },
    Genre { id: 8, name: "News" },
    Genre { id: 9, name: "Kids and Family" },
];

/// All known genres, ordered by ID
pub fn all() -> &'static [Genre] {
    &GENRES
}

/// Look up a genre name, falling back to [`UNKNOWN_GENRE`]
pub fn genre_name(id: u32) -> &'static str {
    GENRES
        .iter()
        .find(|genre| genre.id == id)
        .map(|genre| genre.name)
        .unwrap_or(UNKNOWN_GENRE)
}

/// Reverse lookup by name, ignoring case and surrounding whitespace
///
/// Detail payloads list genres by name rather than ID.
pub fn genre_by_name(name: &str) -> Option<Genre> {
    let name = name.trim();
    GENRES
        .iter()
        .find(|genre| genre.name.eq_ignore_ascii_case(name))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_nine_entries() {
        assert_eq!(all().len(), 9);
        assert!(all().windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn known_ids_resolve() {
        assert_eq!(genre_name(1), "Personal Growth");
        assert_eq!(genre_name(4), "Comedy");
        assert_eq!(genre_name(9), "Kids and Family");
    }

    #[test]
    fn unknown_ids_resolve_to_sentinel() {
        assert_eq!(genre_name(0), UNKNOWN_GENRE);
        assert_eq!(genre_name(10), UNKNOWN_GENRE);
        assert_eq!(genre_name(u32::MAX), "Unknown Genre");
    }

    #[test]
    fn reverse_lookup_ignores_case() {
        assert_eq!(genre_by_name("history").map(|g| g.id), Some(3));
        assert_eq!(genre_by_name("  Kids and Family ").map(|g| g.id), Some(9));
        assert!(genre_by_name("Sports").is_none());
    }
}
