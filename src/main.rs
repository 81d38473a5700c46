// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use console::{Emoji, Term};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use url::Url;

use podshelf::config::{DEFAULT_API_URL, DEFAULT_PAGE_SIZE};
use podshelf::genre;
use podshelf::{
    CatalogEvent, CatalogReporter, ClientConfig, DetailState, Episode, EpisodeKey,
    JsonFileStorage, NoopReporter, ReqwestClient, Session, SharedReporter, Show, SortOrder,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static SEARCH: Emoji<'_, '_> = Emoji("🔍 ", "[~] ");
static STAR: Emoji<'_, '_> = Emoji("★ ", "* ");
static EMPTY_STAR: Emoji<'_, '_> = Emoji("☆ ", "  ");
static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");

/// Browse a podcast catalog and keep track of favorite shows and episodes
#[derive(Parser, Debug)]
#[command(name = "podshelf")]
#[command(version)]
struct Args {
    /// Root URL of the catalog API
    #[arg(long, env = "PODSHELF_API_URL", default_value = DEFAULT_API_URL)]
    api_url: Url,

    /// Directory where favorites are stored
    #[arg(long, env = "PODSHELF_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Shows per page
    #[arg(long, env = "PODSHELF_PAGE_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Quiet mode - suppress spinners
    #[arg(short, long)]
    quiet: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List shows, filtered and sorted
    List {
        /// Only shows whose title contains this text
        #[arg(short, long, default_value = "")]
        search: String,

        /// Sort order: a-z, z-a, newest, oldest
        #[arg(long, default_value = "a-z")]
        sort: SortOrder,

        /// Only shows in this genre (see `genres`)
        #[arg(short, long)]
        genre: Option<u32>,

        /// Only favorited shows
        #[arg(short, long)]
        favorites: bool,

        /// Page to show
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },

    /// Show the seasons and episodes of a show
    Show {
        id: u32,

        /// Only list episodes of this season
        #[arg(short, long)]
        season: Option<u32>,
    },

    /// Toggle a show favorite
    FavoriteShow { id: u32 },

    /// Toggle an episode favorite
    FavoriteEpisode {
        show_id: u32,
        season: u32,
        episode: u32,

        /// Episode title, needed when the season repeats the episode number
        #[arg(short, long)]
        title: Option<String>,
    },

    /// List favorited shows and episodes
    Favorites,

    /// Forget all favorited episodes
    ClearEpisodes {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Forget all favorites
    Reset {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// List known genres
    Genres,
}

/// Catalog reporter showing a spinner while requests are in flight
#[derive(Default)]
struct SpinnerReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl SpinnerReporter {
    fn start(&self, message: String) {
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));

        if let Some(previous) = self.lock().replace(spinner) {
            previous.finish_and_clear();
        }
    }

    fn finish(&self) {
        if let Some(spinner) = self.lock().take() {
            spinner.finish_and_clear();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CatalogReporter for SpinnerReporter {
    fn report(&self, event: CatalogEvent) {
        match event {
            CatalogEvent::FetchingCatalog { url } => {
                self.start(format!("{SEARCH}Fetching catalog: {}", url.cyan()));
            }
            CatalogEvent::FetchingDetail { show_id, .. } => {
                self.start(format!("{SEARCH}Loading seasons for show {}", show_id));
            }
            CatalogEvent::CatalogLoaded { .. }
            | CatalogEvent::DetailLoaded { .. }
            | CatalogEvent::FetchFailed { .. } => self.finish(),
            CatalogEvent::DetailCached { .. } | CatalogEvent::DetailJoined { .. } => {}
        }
    }
}

type CliSession = Session<ReqwestClient, JsonFileStorage>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = ClientConfig::default()
        .with_base_url(args.api_url.clone())
        .with_page_size(args.page_size)
        .with_data_dir(
            args.data_dir
                .clone()
                .unwrap_or_else(ClientConfig::default_data_dir),
        );

    let reporter: SharedReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(SpinnerReporter::default())
    };

    let mut session = Session::open(ReqwestClient::new(), &config, reporter)
        .with_context(|| format!("Failed to open favorites in {}", config.data_dir.display()))?;

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podshelf".bold().magenta(),
            "- Podcast Browser".dimmed()
        );
    }

    match args.command {
        Command::List {
            search,
            sort,
            genre,
            favorites,
            page,
        } => {
            load_catalog(&mut session).await?;
            session.set_search(search);
            session.set_sort(sort);
            session.set_genre(genre);
            session.set_favorites_only(favorites);
            session.set_page(page);
            print_list(&session);
        }

        Command::Show { id, season } => {
            open_show(&mut session, id).await?;
            if season.is_some() {
                session.select_season(season);
            }
            print_show(&session);
        }

        Command::FavoriteShow { id } => {
            let favorited = session
                .toggle_show_favorite(id)
                .context("Failed to save favorites")?;
            report_toggle(&format!("Show {}", id), favorited);
        }

        Command::FavoriteEpisode {
            show_id,
            season,
            episode,
            title,
        } => {
            open_show(&mut session, show_id).await?;
            let matches: Vec<EpisodeKey> = session
                .selection()
                .show()
                .map(|show| {
                    show.find_episodes(season, episode, title.as_deref())
                        .into_iter()
                        .map(Episode::key)
                        .collect()
                })
                .unwrap_or_default();

            let key = match matches.as_slice() {
                [key] => key.clone(),
                [] => bail!(
                    "Show {} has no matching episode {} in season {}",
                    show_id,
                    episode,
                    season
                ),
                several => {
                    let heading = format!(
                        "Season {} has {} episodes numbered {}:",
                        season,
                        several.len(),
                        episode
                    );
                    println!("{WARNING}{}", heading.yellow());
                    for key in several {
                        println!("    {}", key.as_str().dimmed());
                    }
                    bail!("Pick one with --title");
                }
            };

            let favorited = session
                .toggle_episode_favorite(&key)
                .context("Failed to save favorites")?;
            report_toggle(key.as_str(), favorited);
        }

        Command::Favorites => {
            print_favorites(&session);
        }

        Command::ClearEpisodes { yes } => {
            if yes || confirm("Clear all favorite episodes?")? {
                session
                    .clear_episode_favorites()
                    .context("Failed to clear episode favorites")?;
                println!("{SUCCESS}{}", "Episode favorites cleared".green());
            }
        }

        Command::Reset { yes } => {
            if yes || confirm("Reset all favorites?")? {
                session.reset_all().context("Failed to reset favorites")?;
                println!("{SUCCESS}{}", "All favorites cleared".green());
            }
        }

        Command::Genres => {
            for genre in genre::all() {
                println!("  {:>2}  {}", genre.id.to_string().cyan(), genre.name);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "podshelf=debug" } else { "podshelf=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_catalog(session: &mut CliSession) -> Result<()> {
    if let Err(e) = session.refresh_catalog().await {
        if session.shows().is_empty() {
            return Err(e).context("Catalog unavailable");
        }
        println!("{WARNING}{}", "Catalog unavailable, showing cached list".yellow());
    }
    Ok(())
}

async fn open_show(session: &mut CliSession, id: u32) -> Result<()> {
    match session.open_show(id).await {
        DetailState::Failed(e) => Err(e.clone()).context(format!("Failed to load show {}", id)),
        _ => Ok(()),
    }
}

fn print_list(session: &CliSession) {
    let page = session.visible_page();

    if page.items.is_empty() {
        println!("{}", "No podcasts available.".dimmed());
        return;
    }

    for show in &page.items {
        print_summary(session, show);
    }

    println!(
        "\n{} {}/{} ({} shows)",
        "Page".dimmed(),
        page.page.to_string().cyan(),
        page.total_pages.to_string().cyan(),
        page.total_items
    );
}

fn print_summary(session: &CliSession, show: &Show) {
    let star = if session.is_show_favorite(show.id) {
        STAR.to_string().yellow()
    } else {
        EMPTY_STAR.to_string().normal()
    };

    let genres: Vec<&str> = show.genre_ids.iter().map(|id| genre::genre_name(*id)).collect();
    let updated = show
        .last_updated
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!(
        "{}{} {} {}",
        star,
        format!("[{}]", show.id).dimmed(),
        show.title.bold(),
        format!("({})", genres.join(", ")).dimmed()
    );
    println!(
        "     {} seasons, updated {}",
        show.season_count
            .map(|count| count.to_string())
            .unwrap_or_else(|| "?".to_string()),
        updated
    );
}

fn print_show(session: &CliSession) {
    let selection = session.selection();

    let show = match selection.detail() {
        DetailState::Loaded(show) => show,
        DetailState::NotFound => {
            println!("{FAILURE}{}", "Show not found. No seasons available.".red());
            return;
        }
        _ => return,
    };

    print_summary(session, show);
    if !show.description.is_empty() {
        println!("\n{}", truncate(&show.description, 300).dimmed());
    }

    if show.seasons().is_empty() {
        println!("\n{}", "No seasons available".dimmed());
        return;
    }

    println!();
    for season in show.seasons() {
        let marker = if selection.state().active_season_number == Some(season.number) {
            "▶ ".green().to_string()
        } else {
            "  ".to_string()
        };
        println!(
            "{}{} {}",
            marker,
            season.label().bold(),
            format!("({} episodes)", season.episodes.len()).dimmed()
        );
    }

    println!();
    for episode in selection.visible_episodes() {
        let key = episode.key();
        let star = if session.is_episode_favorite(&key) {
            STAR.to_string().yellow()
        } else {
            EMPTY_STAR.to_string().normal()
        };
        println!(
            "{}S{:02}E{:02} {}",
            star, episode.season_number, episode.episode_number, episode.title
        );
    }
}

fn print_favorites(session: &CliSession) {
    let favorites = session.favorites();

    println!("{}", "Favorite shows:".bold());
    if favorites.show_ids().is_empty() {
        println!("  {}", "none".dimmed());
    }
    for id in favorites.show_ids() {
        println!("  {STAR}{}", id.to_string().cyan());
    }

    println!("\n{}", "Favorite episodes:".bold());
    if favorites.episode_keys().is_empty() {
        println!("  {}", "none".dimmed());
    }
    for key in favorites.episode_keys() {
        println!("  {STAR}{}", key);
    }
}

fn report_toggle(label: &str, favorited: bool) {
    if favorited {
        println!("{SUCCESS}{} added to favorites", label.green());
    } else {
        println!("{SUCCESS}{} removed from favorites", label.yellow());
    }
}

fn confirm(question: &str) -> Result<bool> {
    let term = Term::stderr();
    term.write_str(&format!("{} [y/N] ", question))?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
