// Result Pagination
//
// Drives one search session: fetch a page, show it, and ask whether to go
// on while pages come back full. A page exactly as long as the page size
// always leads to one more probe, so a result set that ends on a page
// boundary finishes with an empty probe reported as "End of results.".

use std::io::{self, BufRead, Write};
use tracing::{debug, warn};

use crate::analytics::EventStore;
use crate::database::CatalogGateway;
use crate::models::Film;
use crate::render::write_films;
use crate::search::{SearchFacade, SearchRequest};
use crate::terminal::{Continuation, Terminal};

/// Why a session stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    NoResults,
    EndOfResults,
    Declined,
    InvalidAnswer,
    /// The catalog failed; shown to the user like an empty result
    Failed,
}

impl SessionEnd {
    pub fn message(&self) -> &'static str {
        match self {
            SessionEnd::NoResults | SessionEnd::Failed => "No results",
            SessionEnd::EndOfResults => "End of results.",
            SessionEnd::Declined => "Returning to the main menu.",
            SessionEnd::InvalidAnswer => "Invalid input. Returning to the main menu.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub pages: usize,
    pub rows: usize,
    pub prompts: usize,
    pub end: SessionEnd,
}

enum State {
    Fetching(u32),
    Displaying { offset: u32, page: Vec<Film> },
    AwaitingContinue(u32),
    Done(SessionEnd),
}

/// Page through `request` until it runs out or the user stops
pub async fn paginate<C, S, R, W>(
    facade: &SearchFacade<C, S>,
    request: &SearchRequest,
    terminal: &mut Terminal<R, W>,
) -> io::Result<SessionSummary>
where
    C: CatalogGateway,
    S: EventStore,
    R: BufRead,
    W: Write,
{
    let page_size = facade.page_size();
    let mut summary = SessionSummary {
        pages: 0,
        rows: 0,
        prompts: 0,
        end: SessionEnd::NoResults,
    };
    let mut state = State::Fetching(0);

    loop {
        state = match state {
            State::Fetching(offset) => match facade.search(request, offset).await {
                Ok(page) if page.is_empty() && offset == 0 => State::Done(SessionEnd::NoResults),
                Ok(page) if page.is_empty() => State::Done(SessionEnd::EndOfResults),
                Ok(page) => State::Displaying { offset, page },
                Err(e) => {
                    warn!("Search {:?} at offset {} failed: {}", request, offset, e);
                    State::Done(SessionEnd::Failed)
                }
            },
            State::Displaying { offset, page } => {
                write_films(terminal.output(), &page)?;
                summary.pages += 1;
                summary.rows += page.len();

                if page.len() < page_size as usize {
                    State::Done(SessionEnd::EndOfResults)
                } else {
                    State::AwaitingContinue(offset)
                }
            }
            State::AwaitingContinue(offset) => {
                summary.prompts += 1;
                let prompt = format!("Show next {}? (yes, or no/0 to return to menu): ", page_size);
                match terminal.confirm(&prompt)? {
                    Continuation::Continue => State::Fetching(offset.saturating_add(page_size)),
                    Continuation::Decline => State::Done(SessionEnd::Declined),
                    Continuation::Unrecognized => State::Done(SessionEnd::InvalidAnswer),
                }
            }
            State::Done(end) => {
                terminal.say(end.message())?;
                summary.end = end;
                debug!("Search session ended: {:?}", summary);
                return Ok(summary);
            }
        };
    }
}
