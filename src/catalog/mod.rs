mod fetch;
mod model;
mod parse;

pub use fetch::{CatalogFetcher, DetailOutcome};
pub use model::{Episode, EpisodeKey, Season, Show, ShowId, parse_timestamp};
pub use parse::{parse_show_detail, parse_show_list};
