// Interactive Menus
//
// Main menu (search, popular queries, exit) and the search menu with its
// four search dimensions. Cancelling a prompt unwinds exactly one menu level.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analytics::{AnalyticsLogger, EventStore};
use crate::database::CatalogGateway;
use crate::pagination::paginate;
use crate::render::write_top_queries;
use crate::search::{SearchFacade, SearchRequest};
use crate::terminal::{Prompted, Terminal};

const TITLE_PROMPT: &str = "Enter the title of the movie or part of it (or 0 for back to previous menu): ";
const ACTOR_PROMPT: &str = "Enter full or partial name of actor or actress (or 0 for back to previous menu): ";
const DESCRIPTION_PROMPT: &str = "Enter keyword from description (or 0 for back to previous menu): ";
const GENRE_PROMPT: &str = "Enter the genre (or 0 for back to previous menu): ";

const SEARCH_MENU: &str = "\nMENU:\n\
    1. Search movie by title\n\
    2. Search movie by actors\n\
    3. Search movie by description\n\
    4. Search movie by genre and release year\n\
    0. Back\n\
    Select a menu option (1, 2, 3, 4 or 0): ";

/// Session is one interactive run over a terminal
pub struct Session<C, S> {
    facade: SearchFacade<C, S>,
    analytics: Arc<AnalyticsLogger<S>>,
    top_queries: usize,
}

impl<C: CatalogGateway, S: EventStore> Session<C, S> {
    pub fn new(facade: SearchFacade<C, S>, analytics: Arc<AnalyticsLogger<S>>, top_queries: usize) -> Self {
        Self {
            facade,
            analytics,
            top_queries,
        }
    }

    /// Show the main menu until the user exits
    pub async fn run<R: BufRead, W: Write>(&self, terminal: &mut Terminal<R, W>) -> io::Result<()> {
        let main_menu = format!(
            "\nMENU:\n1. Search movies\n2. Top {} most popular queries\n0. Exit\nSelect a menu option (1, 2, or 0): ",
            self.top_queries
        );

        loop {
            match terminal.choice(&main_menu, &[0, 1, 2])? {
                1 => self.search_menu(terminal).await?,
                2 => {
                    let ranked = self.analytics.top(self.top_queries).await;
                    write_top_queries(terminal.output(), &ranked, self.top_queries)?;
                }
                _ => {
                    terminal.say("Goodbye")?;
                    info!("User left the session");
                    return Ok(());
                }
            }
        }
    }

    async fn search_menu<R: BufRead, W: Write>(&self, terminal: &mut Terminal<R, W>) -> io::Result<()> {
        let request = match terminal.choice(SEARCH_MENU, &[0, 1, 2, 3, 4])? {
            1 => terminal.text(TITLE_PROMPT)?.map(SearchRequest::Title),
            2 => terminal.text(ACTOR_PROMPT)?.map(SearchRequest::Actor),
            3 => terminal.text(DESCRIPTION_PROMPT)?.map(SearchRequest::Description),
            4 => match self.genre_request(terminal).await? {
                Some(request) => request,
                None => return Ok(()),
            },
            _ => return Ok(()),
        };

        match request {
            Prompted::Value(request) => {
                paginate(&self.facade, &request, terminal).await?;
            }
            Prompted::Cancelled => terminal.say("Returning to previous menu...")?,
        }
        Ok(())
    }

    /// Ask for a genre and a release year range. `None` when the catalog
    /// has nothing to choose from.
    async fn genre_request<R: BufRead, W: Write>(
        &self,
        terminal: &mut Terminal<R, W>,
    ) -> io::Result<Option<Prompted<SearchRequest>>> {
        let genres = match self.facade.all_genres().await {
            Ok(genres) if !genres.is_empty() => genres,
            Ok(_) => {
                terminal.say("No genres available in the catalog.")?;
                return Ok(None);
            }
            Err(e) => {
                warn!("Could not load genres: {}", e);
                terminal.say("No genres available in the catalog.")?;
                return Ok(None);
            }
        };

        let genre = loop {
            terminal.say("Available genres:")?;
            for key in genres.keys() {
                terminal.say(&format!(" - {}", key))?;
            }

            let Prompted::Value(input) = terminal.text(GENRE_PROMPT)? else {
                return Ok(Some(Prompted::Cancelled));
            };
            match genres.resolve(&input) {
                Some(genre) => break genre.to_string(),
                None => terminal.say("Invalid genre. Please choose from the list.")?,
            }
        };

        let range = match self.facade.year_bounds().await {
            Ok(Some(range)) => range,
            Ok(None) => {
                terminal.say("No release years available in the catalog.")?;
                return Ok(None);
            }
            Err(e) => {
                warn!("Could not load release years: {}", e);
                terminal.say("No release years available in the catalog.")?;
                return Ok(None);
            }
        };
        terminal.say(&format!("Available release years: from {} to {}", range.min(), range.max()))?;

        loop {
            let Prompted::Value(year_min) =
                terminal.year(&format!("Enter the minimum release year (from {})", range.min()))?
            else {
                return Ok(Some(Prompted::Cancelled));
            };
            let Prompted::Value(year_max) =
                terminal.year(&format!("Enter the maximum release year (up to {})", range.max()))?
            else {
                return Ok(Some(Prompted::Cancelled));
            };

            if range.accepts(year_min, year_max) {
                return Ok(Some(Prompted::Value(SearchRequest::GenreAndYear {
                    genre,
                    year_min,
                    year_max,
                })));
            }
            terminal.say(&format!(
                "Error: Please enter years between {} and {}, and make sure the minimum year is not greater than the maximum year.",
                range.min(),
                range.max()
            ))?;
            terminal.say("Try again.\n")?;
        }
    }
}
